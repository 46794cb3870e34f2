//! Endpoint & Neighbour Table (§4.3) — per-link configuration, discovered
//! neighbours, and per-link trickle timer state.
//!
//! Addressing is left generic: the platform layer that owns physical
//! interfaces and link-local addresses is out of scope (§1 Non-goals), so
//! this table only ever stores and compares whatever `Addr` type the host
//! hands it (a real link-local address, or a test harness's virtual peer id).

pub mod error;
pub mod neighbour;
pub mod trickle;

pub use error::EndpointError;
pub use neighbour::{Neighbour, NeighbourKey};
pub use trickle::TrickleTimer;

use std::collections::HashMap;

use crate::config::EndpointConfig;
use crate::types::{EndpointId, NodeId, TimeMs};

/// One enabled link: its configuration, multicast destination, trickle
/// state, and the neighbours currently heard on it.
pub struct Endpoint<Addr> {
    pub id: EndpointId,
    pub name: String,
    pub config: EndpointConfig,
    /// The link's well-known multicast group address (§4.4 "Addressing").
    pub multicast_addr: Addr,
    pub trickle: TrickleTimer,
    neighbours: HashMap<NeighbourKey, Neighbour<Addr>>,
    next_keepalive_at: TimeMs,
}

impl<Addr: Clone + Eq + std::fmt::Debug> Endpoint<Addr> {
    pub fn neighbours(&self) -> impl Iterator<Item = &Neighbour<Addr>> {
        self.neighbours.values()
    }

    pub fn neighbour(&self, key: &NeighbourKey) -> Option<&Neighbour<Addr>> {
        self.neighbours.get(key)
    }

    pub fn neighbour_count(&self) -> usize {
        self.neighbours.len()
    }

    /// Touches (or creates) the neighbour entry for a peer that just sent us
    /// valid traffic (§4.3 `on_packet`). Returns `true` if this is a newly
    /// discovered neighbour.
    pub fn touch_neighbour(
        &mut self,
        peer_node_id: NodeId,
        peer_endpoint_id: EndpointId,
        peer_address: Addr,
        now: TimeMs,
    ) -> bool {
        let key = NeighbourKey {
            peer_node_id,
            peer_endpoint_id,
        };
        match self.neighbours.get_mut(&key) {
            Some(existing) => {
                existing.last_heard_at = now;
                existing.peer_address = peer_address;
                false
            }
            None => {
                self.neighbours.insert(
                    key,
                    Neighbour {
                        peer_node_id,
                        peer_endpoint_id,
                        peer_address,
                        local_endpoint_id: self.id,
                        last_heard_at: now,
                        last_sent_at: None,
                        last_requested_net_state_at: None,
                        peer_keepalive_interval_ms: None,
                    },
                );
                true
            }
        }
    }

    /// Records that we just unicast something to whichever neighbour sits at
    /// `addr`, if any (§3 "Neighbour" `last_sent_at`). Looked up by address
    /// rather than `NeighbourKey` since that is all a unicast send site
    /// actually has at hand; a multicast `addr` matches no neighbour's
    /// `peer_address` and is a harmless no-op.
    pub fn note_sent(&mut self, addr: &Addr, now: TimeMs) {
        if let Some(n) = self.neighbours.values_mut().find(|n| &n.peer_address == addr) {
            n.last_sent_at = Some(now);
        }
    }

    pub fn note_requested_net_state(&mut self, key: &NeighbourKey, now: TimeMs) {
        if let Some(n) = self.neighbours.get_mut(key) {
            n.last_requested_net_state_at = Some(now);
        }
    }

    pub fn note_peer_keepalive_interval(&mut self, key: &NeighbourKey, interval_ms: u64) {
        if let Some(n) = self.neighbours.get_mut(key) {
            n.peer_keepalive_interval_ms = Some(interval_ms);
        }
    }

    /// Deadline after which this neighbour is reaped for silence (§4.3
    /// keepalive loop): `keepalive_multiplier * peer_interval + jitter`. Uses
    /// our own configured interval until the peer has told us its own.
    fn reap_deadline_ms(&self, neighbour: &Neighbour<Addr>, jitter_ms: u64) -> u64 {
        let peer_interval_ms = neighbour
            .peer_keepalive_interval_ms
            .unwrap_or_else(|| self.config.keepalive_interval.as_millis() as u64);
        peer_interval_ms * self.config.keepalive_multiplier as u64 + jitter_ms
    }

    /// Returns the keys of neighbours that have been silent past their reap
    /// deadline, without removing them (callers reap via [`Self::remove_neighbour`]
    /// so they can notify subscribers per removed neighbour first).
    pub fn stale_neighbours(&self, now: TimeMs) -> Vec<NeighbourKey> {
        self.neighbours
            .iter()
            .filter_map(|(key, n)| {
                let jitter = fastrand::u64(0..=50);
                let deadline = self.reap_deadline_ms(n, jitter);
                if now.saturating_sub(n.last_heard_at) > deadline {
                    Some(*key)
                } else {
                    None
                }
            })
            .collect()
    }

    pub fn remove_neighbour(&mut self, key: &NeighbourKey) -> Option<Neighbour<Addr>> {
        self.neighbours.remove(key)
    }

    /// Whether the configured keepalive interval has elapsed since the last
    /// unsolicited multicast keepalive we emitted.
    pub fn keepalive_due(&self, now: TimeMs) -> bool {
        now >= self.next_keepalive_at
    }

    pub fn arm_next_keepalive(&mut self, now: TimeMs) {
        self.next_keepalive_at = now + self.config.keepalive_interval.as_millis() as u64;
    }

    pub fn next_wakeup(&self, now: TimeMs) -> TimeMs {
        self.trickle.next_wakeup().min(self.next_keepalive_at.max(now))
    }
}

/// The set of enabled endpoints, keyed by name for host-facing calls and by
/// small integer id for wire-facing ones (§4.3 `enable`/`disable`).
#[derive(Default)]
pub struct EndpointTable<Addr> {
    by_name: HashMap<String, EndpointId>,
    endpoints: HashMap<EndpointId, Endpoint<Addr>>,
    next_id: EndpointId,
}

impl<Addr: Clone + Eq + std::fmt::Debug> EndpointTable<Addr> {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            endpoints: HashMap::new(),
            next_id: 0,
        }
    }

    /// Allocates an endpoint id for `name` and starts its trickle/keepalive
    /// state. The transport-level "bring the socket up" step is the caller's
    /// responsibility (typically right before this call) — a [`PortError`]
    /// there is surfaced directly to the caller, never through the
    /// subscription bus (§7, §4.3 added detail).
    ///
    /// [`PortError`]: crate::port::PortError
    pub fn enable(
        &mut self,
        name: &str,
        multicast_addr: Addr,
        config: EndpointConfig,
        now: TimeMs,
    ) -> Result<EndpointId, EndpointError> {
        if self.by_name.contains_key(name) {
            return Err(EndpointError::AlreadyEnabled {
                name: name.to_string(),
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        let trickle = TrickleTimer::new(config.trickle.clone(), now);
        self.endpoints.insert(
            id,
            Endpoint {
                id,
                name: name.to_string(),
                config,
                multicast_addr,
                trickle,
                neighbours: HashMap::new(),
                next_keepalive_at: now,
            },
        );
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Tears down an endpoint, cancelling its trickle and keepalive timers
    /// (§5 "destroying an endpoint cancels its trickle and keepalive").
    pub fn disable(&mut self, name: &str) -> Result<Endpoint<Addr>, EndpointError> {
        let id = self
            .by_name
            .remove(name)
            .ok_or_else(|| EndpointError::NotFound(name.to_string()))?;
        Ok(self.endpoints.remove(&id).expect("name->id index in sync"))
    }

    pub fn by_id(&self, id: EndpointId) -> Option<&Endpoint<Addr>> {
        self.endpoints.get(&id)
    }

    pub fn by_id_mut(&mut self, id: EndpointId) -> Option<&mut Endpoint<Addr>> {
        self.endpoints.get_mut(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Endpoint<Addr>> {
        self.by_name.get(name).and_then(|id| self.endpoints.get(id))
    }

    pub fn id_for_name(&self, name: &str) -> Option<EndpointId> {
        self.by_name.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint<Addr>> {
        self.endpoints.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Endpoint<Addr>> {
        self.endpoints.values_mut()
    }

    pub fn ids(&self) -> Vec<EndpointId> {
        self.endpoints.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
