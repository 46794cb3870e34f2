use crate::types::{EndpointId, NodeId, TimeMs};

/// Another node observed on one of our endpoints, with mutual confirmation
/// tracked separately (via NEIGHBOUR TLVs in the published data, not here) —
/// this struct only tracks liveness (§3 "Neighbour").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Neighbour<Addr> {
    pub peer_node_id: NodeId,
    pub peer_endpoint_id: EndpointId,
    pub peer_address: Addr,
    pub local_endpoint_id: EndpointId,
    pub last_heard_at: TimeMs,
    pub last_sent_at: Option<TimeMs>,
    /// Last time we sent a `REQ_NET_STATE` to this peer, to rate-limit
    /// re-requests (§4.4 reactive rule 1, `EndpointConfig::request_backoff`).
    pub last_requested_net_state_at: Option<TimeMs>,
    /// The peer's advertised keepalive interval, if it has told us one via
    /// KEEPALIVE_INTERVAL; used to compute our own reap deadline for it.
    pub peer_keepalive_interval_ms: Option<u64>,
}

/// Key a neighbour is looked up by within one endpoint (§3).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeighbourKey {
    pub peer_node_id: NodeId,
    pub peer_endpoint_id: EndpointId,
}

impl<Addr> Neighbour<Addr> {
    pub fn key(&self) -> NeighbourKey {
        NeighbourKey {
            peer_node_id: self.peer_node_id,
            peer_endpoint_id: self.peer_endpoint_id,
        }
    }
}
