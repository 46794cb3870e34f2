//! A distributed state-flooding protocol engine for a zero-configuration
//! home network mesh.
//!
//! The engine maintains a per-node append-only set of TLVs, replicates
//! every reachable node's published data network-wide via a trickle-paced
//! flooding protocol, detects bidirectional neighbour reachability on every
//! participating link, and exposes a subscription interface so higher-level
//! agents (prefix assignment, service discovery, link-role election) can
//! react. Platform glue (interfaces, addresses, DHCP, route programming)
//! and those higher-level agents are explicitly out of scope — this crate
//! only reaches the outside world through the narrow [`port`] traits.
//!
//! Six components, in dependency order (§2): [`store`] (Node Store),
//! [`publisher`] (Local Publisher) and [`endpoint`] (Endpoint & Neighbour
//! Table) sit at the bottom; [`flood`] (the Flooding Protocol) and
//! [`reachability`] (Reachability & GC) build on them; [`bus`] (the
//! Subscription Bus) sits on top. [`Engine`] is the single root that owns
//! all six and is the only type collaborators and the host application talk
//! to.

pub mod bus;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod flood;
pub mod hash;
pub mod port;
pub mod publisher;
pub mod reachability;
pub mod stats;
pub mod store;
pub mod tlv;
pub mod types;
pub mod wire;

pub use bus::{EngineObserver, NodeChange, NodeChangeKind, SubscriberId, TlvChange, TlvChangeKind};
pub use config::{EndpointConfig, EngineConfig, TrickleConfig};
pub use endpoint::{Endpoint, EndpointError, Neighbour, NeighbourKey};
pub use error::EngineError;
pub use port::{PortError, Transport};
pub use publisher::TlvHandle;
pub use stats::EngineStats;
pub use store::NodeRecord;
pub use tlv::Tlv;
pub use types::{Digest, EndpointId, NodeId, TimeMs, UpdateNumber};

use std::collections::{HashMap, HashSet};

use log::{debug, info, trace, warn};

use endpoint::EndpointTable;
use publisher::LocalPublisher;
use store::{NodeStore, UpsertEffect};
use wire::Message;

/// One batch of inbound work handed to [`Engine::poll`]: every datagram
/// that became ready on any endpoint since the last call, plus the host's
/// current monotonic clock reading (§5, §6 `recv_ready`/`now`).
pub struct PortEvents<Addr> {
    pub now_ms: TimeMs,
    pub datagrams: Vec<(EndpointId, Addr, Vec<u8>)>,
}

impl<Addr> PortEvents<Addr> {
    pub fn new(now_ms: TimeMs) -> Self {
        Self {
            now_ms,
            datagrams: Vec::new(),
        }
    }
}

/// One observable state change. [`Engine::poll`] batches every change that
/// happened during that tick (both from inbound network traffic and from
/// any `add_tlv`/`remove_tlv` calls made since the previous `poll`) into a
/// `Vec` for collaborators that prefer draining a queue; the same
/// information is delivered synchronously to every registered
/// [`EngineObserver`] at the moment the change happens (§5's ordering
/// guarantees apply to both).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineEvent {
    LocalTlv(TlvChange),
    Tlv(TlvChange),
    Node(NodeChange),
    NetworkHash(Digest),
    ConflictingOrigin(NodeId),
}

/// The distributed state-flooding protocol engine (§2).
///
/// Generic over `T: Transport` so the engine never hardcodes a concrete
/// address type or socket implementation — the platform layer that owns
/// physical interfaces and addresses is explicitly out of scope (§1
/// Non-goals). `T::Addr` is whatever link-local addressing a deployment
/// uses; test harnesses typically use a small integer or enum.
///
/// Single-threaded, cooperative (§5): every state transition happens inside
/// one [`Engine::poll`] call. Nothing here spawns a thread or blocks.
pub struct Engine<T: Transport> {
    own_id: NodeId,
    now: TimeMs,
    transport: T,
    config: EngineConfig,
    store: NodeStore,
    publisher: LocalPublisher,
    endpoints: EndpointTable<T::Addr>,
    bus: bus::SubscriptionBus,
    stats: EngineStats,
    reachable: HashSet<NodeId>,
    reachability_dirty: bool,
    last_emitted_network_hash: Option<Digest>,
    pending_events: Vec<EngineEvent>,
    /// Maps a discovered neighbour back to the `NEIGHBOUR` TLV this engine
    /// published about it in our own node's data, so disable/reap can
    /// retract the claim (§4.5 "mutual neighbour TLVs").
    neighbour_tlv_handles: HashMap<(EndpointId, NeighbourKey), TlvHandle>,
}

impl<T: Transport> Engine<T> {
    pub fn new(own_id: NodeId, transport: T, config: EngineConfig, now: TimeMs) -> Self {
        Self {
            own_id,
            now,
            transport,
            store: NodeStore::new(own_id, now),
            publisher: LocalPublisher::new(),
            endpoints: EndpointTable::new(),
            bus: bus::SubscriptionBus::new(),
            config,
            stats: EngineStats::default(),
            reachable: std::iter::once(own_id).collect(),
            reachability_dirty: true,
            last_emitted_network_hash: None,
            pending_events: Vec::new(),
            neighbour_tlv_handles: HashMap::new(),
        }
    }

    // ---- collaborator API (§6) -------------------------------------------------

    /// Adds a TLV to our own published set (§4.2). Takes effect on the
    /// store only once the republish coalescing window elapses inside a
    /// later `poll`; the handle is valid immediately for `remove_tlv`.
    pub fn add_tlv(&mut self, tlv: Tlv) -> Result<TlvHandle, EngineError> {
        let (handle, _effect) = self.publisher.add_tlv(tlv, self.now)?;
        Ok(handle)
    }

    /// Removes a previously-added TLV. A second removal of an
    /// already-consumed handle is a documented no-op (§8 idempotence law).
    pub fn remove_tlv(&mut self, handle: TlvHandle) {
        self.publisher.remove_tlv(handle, self.now);
    }

    pub fn subscribe(&mut self, observer: Box<dyn EngineObserver>) -> SubscriberId {
        self.bus.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.bus.unsubscribe(id);
    }

    /// Enables a named endpoint, starting its trickle and keepalive timers.
    /// The caller is expected to have already brought the underlying socket
    /// up through its own `Transport`; a failure there is a [`PortError`]
    /// the caller surfaces itself — this call only ever fails with
    /// [`EndpointError::AlreadyEnabled`] (§4.3 added detail, §7 "surfaced on
    /// the `enable_endpoint` call").
    pub fn enable_endpoint(
        &mut self,
        name: &str,
        multicast_addr: T::Addr,
        config: EndpointConfig,
    ) -> Result<EndpointId, EngineError> {
        let id = self
            .endpoints
            .enable(name, multicast_addr, config, self.now)?;
        info!("endpoint \"{name}\" enabled as id {id}");
        Ok(id)
    }

    /// Disables an endpoint, cancelling its trickle/keepalive timers and
    /// retracting any `NEIGHBOUR` TLVs we had published about peers heard
    /// on it (§5 "destroying an endpoint cancels its trickle and
    /// keepalive").
    pub fn disable_endpoint(&mut self, name: &str) -> Result<(), EngineError> {
        let id = self
            .endpoints
            .id_for_name(name)
            .ok_or_else(|| EndpointError::NotFound(name.to_string()))?;
        self.endpoints.disable(name)?;
        let keys: Vec<(EndpointId, NeighbourKey)> = self
            .neighbour_tlv_handles
            .keys()
            .filter(|(endpoint_id, _)| *endpoint_id == id)
            .copied()
            .collect();
        for key in keys {
            if let Some(handle) = self.neighbour_tlv_handles.remove(&key) {
                self.publisher.remove_tlv(handle, self.now);
            }
        }
        self.reachability_dirty = true;
        info!("endpoint \"{name}\" disabled");
        Ok(())
    }

    pub fn find_node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.store.get(id)
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = &NodeRecord> {
        self.store.iter()
    }

    pub fn own_node(&self) -> &NodeRecord {
        self.store.own()
    }

    /// Number of nodes currently known in the store (reachable or still
    /// inside their reachability grace period).
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Recomputes and returns `network_hash`, restricted to the reachable
    /// set (§3, §4.5). Lazy: only re-runs BFS/hashing if something marked
    /// either dirty since the last call.
    pub fn network_hash(&mut self) -> Digest {
        self.recompute_reachability_if_dirty();
        let ids: Vec<NodeId> = self.reachable.iter().copied().collect();
        self.store.network_hash(&ids)
    }

    pub fn find_endpoint_by_id(&self, id: EndpointId) -> Option<&Endpoint<T::Addr>> {
        self.endpoints.by_id(id)
    }

    pub fn find_endpoint_by_name(&self, name: &str) -> Option<&Endpoint<T::Addr>> {
        self.endpoints.by_name(name)
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Latest time the host needs to call `poll` again for every pending
    /// timer (trickle send/interval rollover, keepalive, coalesced
    /// republish) to fire promptly. A single "when to call back" value,
    /// since the engine owns no thread of its own to register callbacks
    /// against.
    pub fn next_wakeup(&self) -> TimeMs {
        let mut candidates: Vec<TimeMs> = Vec::new();
        if let Some(due_since) = self.publisher.republish_due_since() {
            candidates.push(due_since + self.config.republish_coalesce.as_millis() as u64);
        }
        for endpoint in self.endpoints.iter() {
            candidates.push(endpoint.next_wakeup(self.now));
        }
        candidates.into_iter().min().unwrap_or(self.now + 1_000)
    }

    /// Tears the engine down: cancels every timer implicitly (nothing more
    /// to do, since nothing here owns a thread) and fires
    /// `on_node_change(Disappeared)` for every non-self node (§5
    /// "destroying the engine... fires `on_node_change(removed)` for every
    /// non-self node"). Consumes the engine since there is nothing left to
    /// call afterwards.
    pub fn shutdown(mut self) -> Vec<EngineEvent> {
        let own_id = self.own_id;
        let ids: Vec<NodeId> = self
            .store
            .iter()
            .map(|record| record.id)
            .filter(|id| *id != own_id)
            .collect();
        for id in ids {
            self.emit(EngineEvent::Node(NodeChange {
                node_id: id,
                kind: NodeChangeKind::Disappeared,
            }));
        }
        self.pending_events
    }

    // ---- scheduler tick (§5) ----------------------------------------------------

    /// Pumps one scheduler tick: drains ready datagrams, commits a coalesced
    /// local republish if due, recomputes reachability and reaps nodes past
    /// their grace period, runs every endpoint's trickle and keepalive
    /// timers, and lazily recomputes `network_hash`. Returns every
    /// observable state change produced along the way.
    pub fn poll(&mut self, events: PortEvents<T::Addr>) -> Vec<EngineEvent> {
        self.now = events.now_ms;

        for (endpoint_id, src, bytes) in events.datagrams {
            self.handle_datagram(endpoint_id, src, &bytes);
        }

        self.process_republish();
        self.recompute_reachability_if_dirty();
        self.run_gc();
        self.run_trickle_and_keepalive();
        self.recompute_network_hash_and_emit();

        std::mem::take(&mut self.pending_events)
    }

    // ---- internals ---------------------------------------------------------

    fn emit(&mut self, event: EngineEvent) {
        match &event {
            EngineEvent::LocalTlv(change) => self.bus.fire_local_tlv_change(change),
            EngineEvent::Tlv(change) => self.bus.fire_tlv_change(change),
            EngineEvent::Node(change) => self.bus.fire_node_change(change),
            EngineEvent::NetworkHash(hash) => self.bus.fire_network_hash_change(*hash),
            EngineEvent::ConflictingOrigin(node_id) => self.bus.fire_conflicting_origin(*node_id),
        }
        self.pending_events.push(event);
    }

    /// Applies one [`UpsertEffect`] from the store: fires the TLV-diff and
    /// node-appeared events in the canonical order §5 requires (all
    /// removals ascending, then all additions ascending — guaranteed
    /// already by [`store::diff_tlvs`]'s merge) and marks reachability
    /// dirty on any actual change.
    fn apply_upsert_effect(&mut self, id: NodeId, effect: UpsertEffect, is_local: bool) {
        if effect.conflicting_origin {
            self.stats.note_conflicting_origin();
            warn!("conflicting origin for node {id:?}: same version, different content, keeping existing record");
            self.emit(EngineEvent::ConflictingOrigin(id));
            return;
        }
        if effect.diff.is_empty() && !effect.node_appeared {
            return;
        }
        for tlv in effect.diff.removed {
            let change = bus::TlvChange {
                node_id: id,
                kind: TlvChangeKind::Removed,
                tlv,
            };
            if is_local {
                self.emit(EngineEvent::LocalTlv(change.clone()));
            }
            self.emit(EngineEvent::Tlv(change));
        }
        for tlv in effect.diff.added {
            let change = bus::TlvChange {
                node_id: id,
                kind: TlvChangeKind::Added,
                tlv,
            };
            if is_local {
                self.emit(EngineEvent::LocalTlv(change.clone()));
            }
            self.emit(EngineEvent::Tlv(change));
        }
        if effect.node_appeared {
            self.emit(EngineEvent::Node(NodeChange {
                node_id: id,
                kind: NodeChangeKind::Appeared,
            }));
        }
        self.reachability_dirty = true;
    }

    /// Commits a coalesced local republish once the pacing window has
    /// elapsed (§4.2), then force-floods every endpoint (§4.4
    /// "Immediate-flood").
    fn process_republish(&mut self) {
        let Some(due_since) = self.publisher.republish_due_since() else {
            return;
        };
        let elapsed = self.now.saturating_sub(due_since);
        if elapsed < self.config.republish_coalesce.as_millis() as u64 {
            return;
        }
        let (tlvs, update_number) = self.publisher.take_republish_snapshot();
        let own_id = self.own_id;
        let origination_time = self.now;
        let effect = self
            .store
            .upsert_decoded(own_id, tlvs, update_number, origination_time);
        self.apply_upsert_effect(own_id, effect, true);
        self.force_immediate_flood();
    }

    /// Every enabled endpoint sends one `NET_STATE` outside its trickle
    /// interval and resets trickle (§4.4 "Immediate-flood").
    fn force_immediate_flood(&mut self) {
        for endpoint_id in self.endpoints.ids() {
            self.send_net_state_multicast(endpoint_id);
            if let Some(endpoint) = self.endpoints.by_id_mut(endpoint_id) {
                endpoint.trickle.force_reset(self.now);
            }
        }
    }

    fn recompute_reachability_if_dirty(&mut self) {
        if !self.reachability_dirty {
            return;
        }
        let reachable = {
            let nodes = self.store.iter().map(|record| (record.id, record.tlvs.as_slice()));
            reachability::compute_reachable(self.own_id, nodes)
        };
        self.reachable = reachable;
        let now = self.now;
        for id in self.reachable.clone() {
            self.store.mark_reachable(&id, now);
        }
        self.store.mark_network_hash_dirty();
        self.reachability_dirty = false;
    }

    /// Reaps nodes that have been unreachable past the configured grace
    /// period (§4.5, §9 Open Question 1 default `2 * I_max`).
    fn run_gc(&mut self) {
        let grace_ms = self.config.reachability_grace.as_millis() as u64;
        let own_id = self.own_id;
        let known: Vec<(NodeId, TimeMs)> = self
            .store
            .iter()
            .filter(|record| record.id != own_id)
            .map(|record| (record.id, record.last_reachable_at))
            .collect();
        let due = reachability::due_for_reap(known, &self.reachable, self.now, grace_ms);
        if due.is_empty() {
            return;
        }
        for reaped in self.store.reap(&due) {
            let id = reaped.id;
            for tlv in reaped.removed_tlvs {
                self.emit(EngineEvent::Tlv(bus::TlvChange {
                    node_id: id,
                    kind: TlvChangeKind::Removed,
                    tlv,
                }));
            }
            self.emit(EngineEvent::Node(NodeChange {
                node_id: id,
                kind: NodeChangeKind::Disappeared,
            }));
        }
        self.reachability_dirty = true;
    }

    fn recompute_network_hash_and_emit(&mut self) {
        let hash = self.network_hash();
        if self.last_emitted_network_hash != Some(hash) {
            self.last_emitted_network_hash = Some(hash);
            self.emit(EngineEvent::NetworkHash(hash));
        }
    }

    /// Runs every endpoint's trickle timer and keepalive loop, and reaps
    /// neighbours silent past their deadline (§4.3).
    fn run_trickle_and_keepalive(&mut self) {
        for endpoint_id in self.endpoints.ids() {
            let (should_send_trickle, keepalive_due) = match self.endpoints.by_id_mut(endpoint_id)
            {
                Some(endpoint) => (
                    endpoint.trickle.poll(self.now),
                    endpoint.keepalive_due(self.now),
                ),
                None => continue,
            };
            if should_send_trickle {
                self.send_net_state_multicast(endpoint_id);
            }
            if keepalive_due {
                self.send_keepalive(endpoint_id);
                if let Some(endpoint) = self.endpoints.by_id_mut(endpoint_id) {
                    endpoint.arm_next_keepalive(self.now);
                }
            }
            let stale = self
                .endpoints
                .by_id(endpoint_id)
                .map(|endpoint| endpoint.stale_neighbours(self.now))
                .unwrap_or_default();
            for key in stale {
                if let Some(endpoint) = self.endpoints.by_id_mut(endpoint_id) {
                    endpoint.remove_neighbour(&key);
                }
                if let Some(handle) = self.neighbour_tlv_handles.remove(&(endpoint_id, key)) {
                    self.publisher.remove_tlv(handle, self.now);
                }
                self.reachability_dirty = true;
            }
        }
    }

    fn send_net_state_multicast(&mut self, endpoint_id: EndpointId) {
        let hash = self.network_hash();
        self.send_multicast(endpoint_id, &[Message::NetState { network_hash: hash }]);
    }

    fn send_keepalive(&mut self, endpoint_id: EndpointId) {
        let hash = self.network_hash();
        let interval_ms = self
            .endpoints
            .by_id(endpoint_id)
            .map(|endpoint| endpoint.config.keepalive_interval.as_millis() as u32)
            .unwrap_or(0);
        self.send_multicast(
            endpoint_id,
            &[
                Message::NetState { network_hash: hash },
                Message::KeepaliveInterval {
                    endpoint_id,
                    interval_ms,
                },
            ],
        );
    }

    /// Builds and sends one packet: our self-announcing `NEIGHBOUR` hello
    /// (§4.3 "on first valid peer packet") followed by `messages`.
    fn send_to(&mut self, endpoint_id: EndpointId, dst: &T::Addr, messages: &[Message], multicast: bool) {
        let hello = Message::Neighbour {
            peer_node_id: self.own_id,
            peer_endpoint_id: endpoint_id,
            local_endpoint_id: endpoint_id,
        };
        let mut out = Vec::new();
        out.extend_from_slice(&wire::encode_messages(std::slice::from_ref(&hello), self.now));
        out.extend_from_slice(&wire::encode_messages(messages, self.now));

        match self.transport.send(endpoint_id, dst, &out) {
            Ok(()) => {
                if multicast {
                    self.stats.note_multicast_sent();
                } else {
                    self.stats.note_unicast_sent();
                }
                if let Some(endpoint) = self.endpoints.by_id_mut(endpoint_id) {
                    endpoint.note_sent(dst, self.now);
                }
            }
            Err(_) => self.stats.note_transport_error(),
        }
    }

    fn send_multicast(&mut self, endpoint_id: EndpointId, messages: &[Message]) {
        let Some(dst) = self.endpoints.by_id(endpoint_id).map(|e| e.multicast_addr.clone()) else {
            return;
        };
        self.send_to(endpoint_id, &dst, messages, true);
    }

    fn send_unicast(&mut self, endpoint_id: EndpointId, dst: &T::Addr, messages: &[Message]) {
        self.send_to(endpoint_id, dst, messages, false);
    }

    fn handle_datagram(&mut self, endpoint_id: EndpointId, src: T::Addr, bytes: &[u8]) {
        if bytes.len() > 64 * 1024 {
            self.stats.note_decode_error();
            warn!("dropping oversized datagram on endpoint {endpoint_id} ({} bytes)", bytes.len());
            return;
        }
        let messages = match wire::decode_messages(bytes, self.now) {
            Ok(messages) => messages,
            Err(err) => {
                self.stats.note_decode_error();
                debug!("dropping malformed packet on endpoint {endpoint_id}: {err}");
                return;
            }
        };
        trace!("endpoint {endpoint_id}: {} message(s) from {src:?}", messages.len());

        // The sender's self-announcing hello (§4.3) carries the peer
        // identity every other message in the same packet is attributed
        // to; it always leads the packets this engine sends, but we track
        // it as running context rather than assuming position so a
        // reordered or partial packet degrades gracefully.
        let mut current_peer: Option<(NodeId, EndpointId)> = None;

        for message in messages {
            match message {
                Message::Neighbour {
                    peer_node_id,
                    peer_endpoint_id,
                    ..
                } => {
                    current_peer = Some((peer_node_id, peer_endpoint_id));
                    self.on_peer_hello(endpoint_id, &src, peer_node_id, peer_endpoint_id);
                }
                Message::NetState { network_hash } => {
                    if let Some((peer_id, peer_ep)) = current_peer {
                        self.on_net_state(endpoint_id, &src, peer_id, peer_ep, network_hash);
                    }
                }
                Message::ReqNetState => {
                    self.on_req_net_state(endpoint_id, &src);
                }
                Message::NodeState {
                    node_id,
                    update_number,
                    origination_time,
                    content_hash,
                    tlvs,
                } => {
                    self.on_node_state(
                        endpoint_id,
                        &src,
                        node_id,
                        update_number,
                        origination_time,
                        content_hash,
                        tlvs,
                    );
                }
                Message::ReqNodeState { node_id } => {
                    self.on_req_node_state(endpoint_id, &src, node_id);
                }
                Message::KeepaliveInterval {
                    endpoint_id: peer_endpoint_id,
                    interval_ms,
                } => {
                    if let Some((peer_id, _)) = current_peer {
                        let key = NeighbourKey {
                            peer_node_id: peer_id,
                            peer_endpoint_id,
                        };
                        if let Some(endpoint) = self.endpoints.by_id_mut(endpoint_id) {
                            endpoint.note_peer_keepalive_interval(&key, interval_ms as u64);
                        }
                    }
                }
            }
        }
    }

    /// §4.3 `on_packet`: touch (or create) the neighbour entry. On first
    /// discovery, publish a `NEIGHBOUR` TLV on our own node claiming this
    /// link, so other nodes can compute reachability through us once the
    /// peer reciprocates (§4.5).
    fn on_peer_hello(
        &mut self,
        endpoint_id: EndpointId,
        src: &T::Addr,
        peer_node_id: NodeId,
        peer_endpoint_id: EndpointId,
    ) {
        if peer_node_id == self.own_id {
            return; // our own multicast looped back to us
        }
        let is_new = match self.endpoints.by_id_mut(endpoint_id) {
            Some(endpoint) => {
                endpoint.touch_neighbour(peer_node_id, peer_endpoint_id, src.clone(), self.now)
            }
            None => return,
        };
        if !is_new {
            return;
        }
        let key = NeighbourKey {
            peer_node_id,
            peer_endpoint_id,
        };
        let claim = Message::Neighbour {
            peer_node_id,
            peer_endpoint_id,
            local_endpoint_id: endpoint_id,
        }
        .to_tlv(self.now);
        if let Ok((handle, _effect)) = self.publisher.add_tlv(claim, self.now) {
            self.neighbour_tlv_handles.insert((endpoint_id, key), handle);
        }
    }

    /// §4.4 reactive rule 1.
    fn on_net_state(
        &mut self,
        endpoint_id: EndpointId,
        src: &T::Addr,
        peer_id: NodeId,
        peer_ep: EndpointId,
        hash: Digest,
    ) {
        let our_hash = self.network_hash();
        let consistent = hash == our_hash;
        if let Some(endpoint) = self.endpoints.by_id_mut(endpoint_id) {
            if consistent {
                endpoint.trickle.on_consistent();
            } else {
                endpoint.trickle.on_inconsistent(self.now);
            }
        }
        if consistent {
            return;
        }
        let key = NeighbourKey {
            peer_node_id: peer_id,
            peer_endpoint_id: peer_ep,
        };
        let Some(endpoint) = self.endpoints.by_id(endpoint_id) else {
            return;
        };
        let backoff_ms = endpoint.config.request_backoff.as_millis() as u64;
        let should_request = match endpoint.neighbour(&key).and_then(|n| n.last_requested_net_state_at) {
            None => true,
            Some(last) => self.now.saturating_sub(last) >= backoff_ms,
        };
        if should_request {
            self.send_unicast(endpoint_id, src, &[Message::ReqNetState]);
            if let Some(endpoint) = self.endpoints.by_id_mut(endpoint_id) {
                endpoint.note_requested_net_state(&key, self.now);
            }
        }
    }

    /// §4.4 reactive rule 2: unicast one header-only `NODE_STATE` for every
    /// reachable node.
    fn on_req_net_state(&mut self, endpoint_id: EndpointId, src: &T::Addr) {
        self.recompute_reachability_if_dirty();
        let messages: Vec<Message> = self
            .reachable
            .iter()
            .filter_map(|id| self.store.get(id))
            .map(flood::header_node_state)
            .collect();
        if messages.is_empty() {
            return;
        }
        self.send_unicast(endpoint_id, src, &messages);
    }

    /// §4.4 reactive rule 3.
    fn on_node_state(
        &mut self,
        endpoint_id: EndpointId,
        src: &T::Addr,
        node_id: NodeId,
        update_number: UpdateNumber,
        origination_time: TimeMs,
        content_hash: Digest,
        tlvs: Option<Vec<Tlv>>,
    ) {
        match tlvs {
            Some(tlvs) => {
                if !tlv::is_canonical(&tlvs) {
                    self.stats.note_decode_error();
                    return;
                }
                let effect = match self.store.upsert_verified(
                    node_id,
                    tlvs,
                    update_number,
                    origination_time,
                    content_hash,
                ) {
                    Ok(effect) => effect,
                    Err(store::StoreError::HashMismatch { .. }) => {
                        self.stats.note_hash_mismatch();
                        warn!("hash mismatch for node {node_id:?}: advertised {content_hash:?} does not match its TLVs; dropping");
                        return;
                    }
                    Err(err) => {
                        self.stats.note_decode_error();
                        warn!("rejecting NODE_STATE for node {node_id:?}: {err}");
                        return;
                    }
                };
                self.apply_upsert_effect(node_id, effect, false);
            }
            None => {
                let existing = self.store.get(&node_id).map(|r| r.update_number);
                match existing {
                    None => {
                        self.send_unicast(endpoint_id, src, &[Message::ReqNodeState { node_id }]);
                    }
                    Some(ours) if ours < update_number => {
                        self.send_unicast(endpoint_id, src, &[Message::ReqNodeState { node_id }]);
                    }
                    Some(ours) if ours > update_number => {
                        let record = self.store.get(&node_id).expect("checked above").clone();
                        self.note_if_oversize(endpoint_id, &record);
                        let msg = flood::full_node_state(&record);
                        self.send_unicast(endpoint_id, src, &[msg]);
                    }
                    _ => {}
                }
            }
        }
    }

    /// §4.4 reactive rule 4.
    fn on_req_node_state(&mut self, endpoint_id: EndpointId, src: &T::Addr, node_id: NodeId) {
        let Some(record) = self.store.get(&node_id) else {
            return;
        };
        self.note_if_oversize(endpoint_id, record);
        let msg = flood::full_node_state(record);
        self.send_unicast(endpoint_id, src, &[msg]);
    }

    /// Counts (but never blocks) a full publish that exceeds the endpoint's
    /// multicast MTU budget (§7 `Oversize`). Full publishes in this engine
    /// always go unicast already (§4.4 "full publishes and requests go
    /// unicast"), so there is nothing to switch — this only keeps the
    /// `oversize_count` counter honest for scenario 5's tube-of-N check.
    fn note_if_oversize(&mut self, endpoint_id: EndpointId, record: &NodeRecord) {
        let budget = self
            .endpoints
            .by_id(endpoint_id)
            .map(|e| e.config.multicast_mtu_budget)
            .unwrap_or(usize::MAX);
        if flood::full_publish_exceeds_budget(record, budget) {
            self.stats.note_oversize();
            debug!("full publish for node {:?} exceeds endpoint {endpoint_id} mtu budget, unicasting", record.id);
        }
    }
}
