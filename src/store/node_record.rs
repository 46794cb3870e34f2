use crate::tlv::Tlv;
use crate::types::{Digest, NodeId, TimeMs, UpdateNumber};

/// One node's latest known published state (§3 "Node Record").
#[derive(Clone, Debug)]
pub struct NodeRecord {
    pub id: NodeId,
    pub tlvs: Vec<Tlv>,
    pub content_hash: Digest,
    pub origination_time: TimeMs,
    pub update_number: UpdateNumber,
    /// Last time reachability analysis observed this node on a path from
    /// self. Seeded to the record's insertion time so a freshly inserted node
    /// gets a full grace period before it can be reaped.
    pub last_reachable_at: TimeMs,
}

impl NodeRecord {
    /// The `(update_number, origination_time)` pair records are ordered by
    /// when resolving which of two candidate versions wins (§3 invariants).
    pub fn version_key(&self) -> (UpdateNumber, TimeMs) {
        (self.update_number, self.origination_time)
    }
}
