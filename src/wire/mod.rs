//! Wire messages: the handful of TLV types the engine itself emits and
//! consumes (§6). Every other TLV type (≥ 32) is an agent-defined payload the
//! engine carries opaquely inside a node's published set — it never appears
//! at this layer.

pub mod error;

pub use error::MessageDecodeError;

use crate::tlv::{self, Tlv};
use crate::types::{Digest, NodeId, TimeMs, UpdateNumber};

pub const TYPE_REQ_NET_STATE: u16 = 1;
pub const TYPE_REQ_NODE_STATE: u16 = 2;
pub const TYPE_NET_STATE: u16 = 3;
pub const TYPE_NODE_STATE: u16 = 4;
pub const TYPE_NEIGHBOUR: u16 = 5;
pub const TYPE_KEEPALIVE_INTERVAL: u16 = 6;

/// First type value reserved for agent-defined (opaque) TLVs; the engine
/// never assigns meaning to these, only stores and republishes them.
pub const AGENT_TLV_TYPE_FLOOR: u16 = 32;

/// One protocol message, decoded from or destined to become one top-level
/// TLV on an endpoint's socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    ReqNetState,
    ReqNodeState {
        node_id: NodeId,
    },
    NetState {
        network_hash: Digest,
    },
    /// `tlvs: None` is the header-only "offer" form; `Some(_)` is a full
    /// publish carrying the node's canonical TLV sequence.
    NodeState {
        node_id: NodeId,
        update_number: UpdateNumber,
        /// Absolute monotonic origination time, already reconstructed from
        /// the wire's `origination_ms_ago` relative to the receiver's `now`.
        origination_time: TimeMs,
        content_hash: Digest,
        tlvs: Option<Vec<Tlv>>,
    },
    Neighbour {
        peer_node_id: NodeId,
        peer_endpoint_id: u32,
        local_endpoint_id: u32,
    },
    KeepaliveInterval {
        endpoint_id: u32,
        interval_ms: u32,
    },
}

impl Message {
    /// Encodes this message to a single top-level [`Tlv`]. `now` is needed
    /// only for `NodeState`, to turn the absolute `origination_time` back
    /// into the wire's `origination_ms_ago`.
    pub fn to_tlv(&self, now: TimeMs) -> Tlv {
        match self {
            Message::ReqNetState => Tlv::new(TYPE_REQ_NET_STATE, Vec::new()),
            Message::ReqNodeState { node_id } => {
                Tlv::new(TYPE_REQ_NODE_STATE, node_id.as_bytes().to_vec())
            }
            Message::NetState { network_hash } => {
                Tlv::new(TYPE_NET_STATE, network_hash.as_bytes().to_vec())
            }
            Message::NodeState {
                node_id,
                update_number,
                origination_time,
                content_hash,
                tlvs,
            } => {
                let ms_ago = now.saturating_sub(*origination_time) as u32;
                let mut value = Vec::with_capacity(8 + 4 + 4 + 16);
                value.extend_from_slice(node_id.as_bytes());
                value.extend_from_slice(&update_number.to_be_bytes());
                value.extend_from_slice(&ms_ago.to_be_bytes());
                value.extend_from_slice(content_hash.as_bytes());
                if let Some(tlvs) = tlvs {
                    value.extend_from_slice(&tlv::encode_sequence(tlvs));
                }
                Tlv::new(TYPE_NODE_STATE, value)
            }
            Message::Neighbour {
                peer_node_id,
                peer_endpoint_id,
                local_endpoint_id,
            } => {
                let mut value = Vec::with_capacity(8 + 4 + 4);
                value.extend_from_slice(peer_node_id.as_bytes());
                value.extend_from_slice(&peer_endpoint_id.to_be_bytes());
                value.extend_from_slice(&local_endpoint_id.to_be_bytes());
                Tlv::new(TYPE_NEIGHBOUR, value)
            }
            Message::KeepaliveInterval {
                endpoint_id,
                interval_ms,
            } => {
                let mut value = Vec::with_capacity(8);
                value.extend_from_slice(&endpoint_id.to_be_bytes());
                value.extend_from_slice(&interval_ms.to_be_bytes());
                Tlv::new(TYPE_KEEPALIVE_INTERVAL, value)
            }
        }
    }

    /// Decodes a single top-level [`Tlv`] into a [`Message`]. `now` is the
    /// receiver's current monotonic time, used to reconstruct `NodeState`'s
    /// absolute `origination_time` from the wire's relative `ms_ago`.
    pub fn from_tlv(tlv: &Tlv, now: TimeMs) -> Result<Message, MessageDecodeError> {
        let v = &tlv.value;
        match tlv.tlv_type {
            TYPE_REQ_NET_STATE => Ok(Message::ReqNetState),
            TYPE_REQ_NODE_STATE => {
                require_len(tlv.tlv_type, v, 8)?;
                Ok(Message::ReqNodeState {
                    node_id: read_node_id(v),
                })
            }
            TYPE_NET_STATE => {
                require_len(tlv.tlv_type, v, 16)?;
                Ok(Message::NetState {
                    network_hash: read_digest(&v[0..16]),
                })
            }
            TYPE_NODE_STATE => {
                require_len(tlv.tlv_type, v, 8 + 4 + 4 + 16)?;
                let node_id = read_node_id(v);
                let update_number = u32::from_be_bytes(v[8..12].try_into().unwrap());
                let ms_ago = u32::from_be_bytes(v[12..16].try_into().unwrap()) as u64;
                let content_hash = read_digest(&v[16..32]);
                let rest = &v[32..];
                let tlvs = if rest.is_empty() {
                    None
                } else {
                    Some(tlv::decode_all(rest)?)
                };
                Ok(Message::NodeState {
                    node_id,
                    update_number,
                    origination_time: now.saturating_sub(ms_ago),
                    content_hash,
                    tlvs,
                })
            }
            TYPE_NEIGHBOUR => {
                require_len(tlv.tlv_type, v, 8 + 4 + 4)?;
                let peer_node_id = read_node_id(v);
                let peer_endpoint_id = u32::from_be_bytes(v[8..12].try_into().unwrap());
                let local_endpoint_id = u32::from_be_bytes(v[12..16].try_into().unwrap());
                Ok(Message::Neighbour {
                    peer_node_id,
                    peer_endpoint_id,
                    local_endpoint_id,
                })
            }
            TYPE_KEEPALIVE_INTERVAL => {
                require_len(tlv.tlv_type, v, 8)?;
                let endpoint_id = u32::from_be_bytes(v[0..4].try_into().unwrap());
                let interval_ms = u32::from_be_bytes(v[4..8].try_into().unwrap());
                Ok(Message::KeepaliveInterval {
                    endpoint_id,
                    interval_ms,
                })
            }
            other => Err(MessageDecodeError::Opaque(other)),
        }
    }
}

/// Encodes a whole packet as a concatenation of message TLVs, in order.
/// `now` is used for every `NodeState`'s `origination_ms_ago` field.
pub fn encode_messages(messages: &[Message], now: TimeMs) -> Vec<u8> {
    let mut out = Vec::new();
    for message in messages {
        message.to_tlv(now).encode(&mut out);
    }
    out
}

/// Decodes a whole packet into its message sequence. A packet is always
/// composed exclusively of the engine's own message TLV types (1, 2, 3, 4,
/// 5, 6) — agent-defined opaque payloads only ever travel nested inside a
/// `NodeState`'s published TLVs, never at this top level — so an
/// [`MessageDecodeError::Opaque`] here always means a malformed or
/// adversarial packet.
pub fn decode_messages(bytes: &[u8], now: TimeMs) -> Result<Vec<Message>, MessageDecodeError> {
    tlv::decode_all(bytes)?
        .iter()
        .map(|t| Message::from_tlv(t, now))
        .collect()
}

fn require_len(tlv_type: u16, value: &[u8], need: usize) -> Result<(), MessageDecodeError> {
    if value.len() < need {
        Err(MessageDecodeError::ValueTooShort {
            tlv_type,
            got: value.len(),
            need,
        })
    } else {
        Ok(())
    }
}

fn read_node_id(v: &[u8]) -> NodeId {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&v[0..8]);
    NodeId::new(bytes)
}

fn read_digest(v: &[u8]) -> Digest {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&v[0..16]);
    Digest(bytes)
}
