//! Reachability & GC (§4.5) — the undirected mutual-neighbour graph, BFS
//! from our own node, and the grace-period garbage collector.
//!
//! A node is reachable iff there is a path to it from `own_node` where every
//! edge is confirmed by *both* endpoints publishing a `NEIGHBOUR` TLV naming
//! the other (§4.5, §GLOSSARY "Reachable"). The graph is rebuilt from
//! scratch on each call — cheap enough at residential-mesh scale (tens of
//! nodes) and simpler than incrementally maintaining an edge set across
//! upserts/reaps.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::tlv::Tlv;
use crate::types::{EndpointId, NodeId, TimeMs};
use crate::wire::{self, Message};

/// One directed `NEIGHBOUR` claim extracted from a node's published TLVs:
/// "I am `from_endpoint` and I hear `to` on its `to_endpoint`".
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct NeighbourClaim {
    from: NodeId,
    from_endpoint: EndpointId,
    to: NodeId,
    to_endpoint: EndpointId,
}

/// Parses every `NEIGHBOUR` TLV out of one node's published sequence. TLVs
/// this engine does not own (agent-defined, type >= 32, or any other message
/// type) are ignored here — this function only ever looks at §4.5's input.
fn claims_of(node_id: NodeId, tlvs: &[Tlv]) -> Vec<NeighbourClaim> {
    tlvs.iter()
        .filter(|t| t.tlv_type == wire::TYPE_NEIGHBOUR)
        .filter_map(|t| match Message::from_tlv(t, 0) {
            Ok(Message::Neighbour {
                peer_node_id,
                peer_endpoint_id,
                local_endpoint_id,
            }) => Some(NeighbourClaim {
                from: node_id,
                from_endpoint: local_endpoint_id,
                to: peer_node_id,
                to_endpoint: peer_endpoint_id,
            }),
            _ => None,
        })
        .collect()
}

/// Computes the set of nodes reachable from `own_id`, given an iterator over
/// every known node's id and published TLVs (typically [`crate::store::NodeStore::iter`]
/// mapped down to `(id, &tlvs)`). Always includes `own_id` itself.
pub fn compute_reachable<'a>(
    own_id: NodeId,
    nodes: impl IntoIterator<Item = (NodeId, &'a [Tlv])>,
) -> HashSet<NodeId> {
    let mut claims: HashMap<NodeId, Vec<NeighbourClaim>> = HashMap::new();
    for (id, tlvs) in nodes {
        claims.insert(id, claims_of(id, tlvs));
    }

    // An edge (a, b) exists only if a claims to hear b AND b claims to hear a
    // (mutual confirmation, §4.5).
    let mut adjacency: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
    for (from, from_claims) in &claims {
        for claim in from_claims {
            let reciprocated = claims
                .get(&claim.to)
                .map(|back| {
                    back.iter().any(|c| {
                        c.to == *from
                            && c.to_endpoint == claim.from_endpoint
                            && c.from_endpoint == claim.to_endpoint
                    })
                })
                .unwrap_or(false);
            if reciprocated {
                adjacency.entry(*from).or_default().insert(claim.to);
                adjacency.entry(claim.to).or_default().insert(*from);
            }
        }
    }

    let mut reachable = HashSet::new();
    reachable.insert(own_id);
    let mut queue = VecDeque::new();
    queue.push_back(own_id);
    while let Some(current) = queue.pop_front() {
        if let Some(neighbours) = adjacency.get(&current) {
            for next in neighbours {
                if reachable.insert(*next) {
                    queue.push_back(*next);
                }
            }
        }
    }
    reachable
}

/// Given the full set of known ids and the set BFS found reachable, decides
/// which unreachable ids have been unreachable long enough (`now -
/// last_reachable_at > grace`) to reap (§4.5).
pub fn due_for_reap(
    known: impl IntoIterator<Item = (NodeId, TimeMs)>,
    reachable: &HashSet<NodeId>,
    now: TimeMs,
    grace_ms: u64,
) -> Vec<NodeId> {
    known
        .into_iter()
        .filter(|(id, last_reachable_at)| {
            !reachable.contains(id) && now.saturating_sub(*last_reachable_at) > grace_ms
        })
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbour_tlv(peer: NodeId, peer_ep: EndpointId, local_ep: EndpointId) -> Tlv {
        Message::Neighbour {
            peer_node_id: peer,
            peer_endpoint_id: peer_ep,
            local_endpoint_id: local_ep,
        }
        .to_tlv(0)
    }

    #[test]
    fn mutual_claim_is_reachable() {
        let a = NodeId::new([1; 8]);
        let b = NodeId::new([2; 8]);
        let a_tlvs = vec![neighbour_tlv(b, 0, 0)];
        let b_tlvs = vec![neighbour_tlv(a, 0, 0)];
        let reachable = compute_reachable(a, [(a, a_tlvs.as_slice()), (b, b_tlvs.as_slice())]);
        assert!(reachable.contains(&a));
        assert!(reachable.contains(&b));
    }

    #[test]
    fn one_sided_claim_is_not_reachable() {
        let a = NodeId::new([1; 8]);
        let b = NodeId::new([2; 8]);
        let a_tlvs = vec![neighbour_tlv(b, 0, 0)];
        let b_tlvs: Vec<Tlv> = Vec::new();
        let reachable = compute_reachable(a, [(a, a_tlvs.as_slice()), (b, b_tlvs.as_slice())]);
        assert!(reachable.contains(&a));
        assert!(!reachable.contains(&b));
    }

    #[test]
    fn transitive_reachability_through_a_chain() {
        let a = NodeId::new([1; 8]);
        let b = NodeId::new([2; 8]);
        let c = NodeId::new([3; 8]);
        let a_tlvs = vec![neighbour_tlv(b, 0, 0)];
        let b_tlvs = vec![neighbour_tlv(a, 0, 0), neighbour_tlv(c, 0, 1)];
        let c_tlvs = vec![neighbour_tlv(b, 1, 0)];
        let reachable = compute_reachable(
            a,
            [
                (a, a_tlvs.as_slice()),
                (b, b_tlvs.as_slice()),
                (c, c_tlvs.as_slice()),
            ],
        );
        assert_eq!(reachable.len(), 3);
    }

    #[test]
    fn unreachable_past_grace_is_due_for_reap() {
        let a = NodeId::new([1; 8]);
        let stray = NodeId::new([9; 8]);
        let reachable: HashSet<NodeId> = [a].into_iter().collect();
        let due = due_for_reap([(a, 0), (stray, 0)], &reachable, 10_000, 5_000);
        assert_eq!(due, vec![stray]);
    }
}
