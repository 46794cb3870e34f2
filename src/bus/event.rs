use crate::tlv::Tlv;
use crate::types::{Digest, NodeId};

/// Reason a node's TLV set changed, passed to [`super::EngineObserver::on_tlv_change`]
/// and [`super::EngineObserver::on_local_tlv_change`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TlvChangeKind {
    Added,
    Removed,
}

/// Reason a node appeared or disappeared from the store, passed to
/// [`super::EngineObserver::on_node_change`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeChangeKind {
    Appeared,
    /// Reaped after the unreachable grace period, or (for every non-self
    /// node) the engine itself being torn down (§5 Cancellation).
    Disappeared,
}

/// One TLV add/remove, always delivered in canonical order (all removals
/// ascending, then all additions ascending) for a single upsert (§5).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlvChange {
    pub node_id: NodeId,
    pub kind: TlvChangeKind,
    pub tlv: Tlv,
}

/// One node appearing or disappearing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeChange {
    pub node_id: NodeId,
    pub kind: NodeChangeKind,
}
