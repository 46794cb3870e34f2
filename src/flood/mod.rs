//! Flooding Protocol (§4.4) — pure decision helpers for the message engine.
//!
//! These functions never touch a transport or mutate the store: they decide
//! *what* a `NODE_STATE` publish should look like and whether it fits an
//! endpoint's multicast budget. [`crate::Engine`] is the only thing that
//! actually sends bytes, so the reactive rules here stay unit-testable
//! without a full engine.

use crate::store::NodeRecord;
use crate::tlv;
use crate::wire::Message;

/// Encoded size (as a top-level TLV, header included) a full `NODE_STATE`
/// publish for `record` would take on the wire.
pub fn full_publish_wire_len(record: &NodeRecord) -> usize {
    let encoded_tlvs = tlv::encode_sequence(&record.tlvs);
    // top-level header (4) + node_id(8) + update_number(4) + ms_ago(4) +
    // content_hash(16) + nested tlvs, then padded to 4 bytes by the wire
    // codec the same way any other TLV value is.
    let value_len = 8 + 4 + 4 + 16 + encoded_tlvs.len();
    let pad = (4 - (value_len % 4)) % 4;
    4 + value_len + pad
}

/// Whether a full publish for `record` exceeds the endpoint's multicast MTU
/// budget and must be switched to unicast instead (§4.4, §7 `Oversize`).
pub fn full_publish_exceeds_budget(record: &NodeRecord, mtu_budget: usize) -> bool {
    full_publish_wire_len(record) > mtu_budget
}

/// Builds the full `NODE_STATE` publish form (header + TLVs) for `record`.
pub fn full_node_state(record: &NodeRecord) -> Message {
    Message::NodeState {
        node_id: record.id,
        update_number: record.update_number,
        origination_time: record.origination_time,
        content_hash: record.content_hash,
        tlvs: Some(record.tlvs.clone()),
    }
}

/// Builds the header-only `NODE_STATE` offer form for `record`, used to
/// advertise a node's version without its full content (§4.4 reactive rule
/// 2, and rule 3's "our copy is strictly newer" reply when it still fits).
pub fn header_node_state(record: &NodeRecord) -> Message {
    Message::NodeState {
        node_id: record.id,
        update_number: record.update_number,
        origination_time: record.origination_time,
        content_hash: record.content_hash,
        tlvs: None,
    }
}
