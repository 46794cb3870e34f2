//! A small in-memory network simulator used by the scenario tests in this
//! directory. Collects the simulated medium, virtual clock, and per-node
//! bookkeeping here rather than duplicating it in every test file.
//!
//! There are no real sockets and no real threads: every node's [`Engine`] is
//! driven from one single-threaded loop that advances a shared virtual clock
//! and hands each node whatever datagrams the medium queued for it since the
//! last tick.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use hncp_engine::{
    EndpointConfig, Engine, EngineConfig, EngineEvent, NodeId, PortError, PortEvents, Transport,
};

pub type LinkId = u32;

/// The address type this harness's [`Transport`] impl hands the engine: a
/// logical link id plus, for unicast sends, the specific peer on that link.
/// `peer: None` is the link's multicast group address.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct VirtualAddr {
    pub link: LinkId,
    pub peer: Option<NodeId>,
}

struct Datagram {
    link: LinkId,
    from: NodeId,
    to: Option<NodeId>,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct MediumInner {
    members: HashMap<LinkId, Vec<NodeId>>,
    /// Directional drops: `(link, from, to)` present here never arrives,
    /// modelling a one-way partition (§8 scenario 3 "drop A→B direction only").
    blocked: HashSet<(LinkId, NodeId, NodeId)>,
    pending: Vec<Datagram>,
}

/// The shared medium every node's [`VirtualTransport`] sends into. Cheaply
/// cloneable (an `Rc<RefCell<_>>` handle) so each node's transport and the
/// test's [`Network`] driver can both reach it.
#[derive(Clone, Default)]
pub struct Medium(Rc<RefCell<MediumInner>>);

impl Medium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, link: LinkId, node: NodeId) {
        let entry = self.0.borrow_mut().members.entry(link).or_default().clone();
        if !entry.contains(&node) {
            self.0.borrow_mut().members.get_mut(&link).unwrap().push(node);
        }
    }

    pub fn block(&self, link: LinkId, from: NodeId, to: NodeId) {
        self.0.borrow_mut().blocked.insert((link, from, to));
    }

    pub fn unblock(&self, link: LinkId, from: NodeId, to: NodeId) {
        self.0.borrow_mut().blocked.remove(&(link, from, to));
    }

    fn send(&self, link: LinkId, from: NodeId, to: Option<NodeId>, bytes: Vec<u8>) {
        self.0.borrow_mut().pending.push(Datagram { link, from, to, bytes });
    }

    /// Moves every datagram queued since the last drain into `inboxes`,
    /// expanding multicast sends to every other member on the link and
    /// respecting blocked directions.
    fn drain_into(&self, inboxes: &mut HashMap<NodeId, Vec<(LinkId, NodeId, Vec<u8>)>>) {
        let mut inner = self.0.borrow_mut();
        let pending = std::mem::take(&mut inner.pending);
        for dgram in pending {
            let members = inner.members.get(&dgram.link).cloned().unwrap_or_default();
            let targets: Vec<NodeId> = match dgram.to {
                Some(to) => vec![to],
                None => members.into_iter().filter(|m| *m != dgram.from).collect(),
            };
            for target in targets {
                if inner.blocked.contains(&(dgram.link, dgram.from, target)) {
                    continue;
                }
                inboxes
                    .entry(target)
                    .or_default()
                    .push((dgram.link, dgram.from, dgram.bytes.clone()));
            }
        }
    }
}

/// A node's only way to reach the medium. Send failures are never
/// synthesized by this harness — transient-failure behaviour (§7
/// `TransportError`) is exercised at the unit level instead, where a mock can
/// fail deterministically on command.
pub struct VirtualTransport {
    medium: Medium,
    own_id: NodeId,
}

impl Transport for VirtualTransport {
    type Addr = VirtualAddr;

    fn send(&mut self, _endpoint: u32, dst: &VirtualAddr, bytes: &[u8]) -> Result<(), PortError> {
        self.medium.send(dst.link, self.own_id, dst.peer, bytes.to_vec());
        Ok(())
    }
}

/// One simulated node: its engine plus the local endpoint id it was assigned
/// for each link it joined (endpoint ids are chosen locally per §3, so two
/// nodes on the same link may number it differently).
pub struct SimNode {
    pub id: NodeId,
    pub engine: Engine<VirtualTransport>,
    link_endpoint: HashMap<LinkId, u32>,
}

/// Drives a whole simulated mesh: the medium, the virtual clock, and every
/// participating node, in one single-threaded loop (§5's cooperative
/// scheduling model, replicated once per simulated node rather than once per
/// process).
pub struct Network {
    medium: Medium,
    now: u64,
    next_link_id: LinkId,
    next_node_ordinal: u8,
    nodes: HashMap<String, SimNode>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            medium: Medium::new(),
            now: 0,
            next_link_id: 0,
            next_node_ordinal: 1,
            nodes: HashMap::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    fn fresh_node_id(&mut self) -> NodeId {
        let ordinal = self.next_node_ordinal;
        self.next_node_ordinal += 1;
        NodeId::new([ordinal; 8])
    }

    /// Adds a node with default engine configuration. Returns its assigned
    /// [`NodeId`] for convenience (also retrievable later via `network.id_of`).
    pub fn add_node(&mut self, name: &str) -> NodeId {
        self.add_node_with_config(name, EngineConfig::default())
    }

    pub fn add_node_with_config(&mut self, name: &str, config: EngineConfig) -> NodeId {
        let id = self.fresh_node_id();
        let transport = VirtualTransport {
            medium: self.medium.clone(),
            own_id: id,
        };
        let engine = Engine::new(id, transport, config, self.now);
        self.nodes.insert(
            name.to_string(),
            SimNode {
                id,
                engine,
                link_endpoint: HashMap::new(),
            },
        );
        id
    }

    pub fn id_of(&self, name: &str) -> NodeId {
        self.nodes.get(name).expect("unknown node").id
    }

    pub fn engine_mut(&mut self, name: &str) -> &mut Engine<VirtualTransport> {
        &mut self.nodes.get_mut(name).expect("unknown node").engine
    }

    pub fn engine(&self, name: &str) -> &Engine<VirtualTransport> {
        &self.nodes.get(name).expect("unknown node").engine
    }

    /// Connects every named node to a new shared link, enabling a
    /// correspondingly-named endpoint on each and joining them to the same
    /// multicast group in the medium (§8 scenarios describe links this way,
    /// e.g. "connect endpoint A.eth0 <-> B.eth1").
    pub fn add_link(&mut self, link_name: &str, members: &[&str]) -> LinkId {
        self.add_link_with_config(link_name, members, EndpointConfig::default())
    }

    pub fn add_link_with_config(
        &mut self,
        link_name: &str,
        members: &[&str],
        config: EndpointConfig,
    ) -> LinkId {
        let link = self.next_link_id;
        self.next_link_id += 1;
        for &name in members {
            let node = self.nodes.get_mut(name).expect("unknown node");
            self.medium.join(link, node.id);
            let multicast_addr = VirtualAddr { link, peer: None };
            let endpoint_id = node
                .engine
                .enable_endpoint(link_name, multicast_addr, config.clone())
                .expect("enable_endpoint should not fail against a virtual transport");
            node.link_endpoint.insert(link, endpoint_id);
        }
        link
    }

    /// Tears down `name`'s engine and replaces it with a fresh one carrying
    /// the same node id (§8 scenario 4 "remove cpe then recreate it with the
    /// same id"). The new engine starts with no enabled endpoints — the
    /// caller re-joins whatever links the old incarnation had via
    /// [`Self::rejoin_link`], exactly as a restarted process would
    /// re-`enable_endpoint` before publishing anything.
    pub fn replace_node(&mut self, name: &str, id: NodeId, config: EngineConfig) {
        let transport = VirtualTransport {
            medium: self.medium.clone(),
            own_id: id,
        };
        let engine = Engine::new(id, transport, config, self.now);
        self.nodes.insert(
            name.to_string(),
            SimNode {
                id,
                engine,
                link_endpoint: HashMap::new(),
            },
        );
    }

    /// Re-enables `name`'s endpoint for an already-existing `link` (used
    /// after [`Self::replace_node`] to rejoin the mesh under the same id).
    pub fn rejoin_link(&mut self, name: &str, link: LinkId, link_name: &str, config: EndpointConfig) {
        let node = self.nodes.get_mut(name).expect("unknown node");
        self.medium.join(link, node.id);
        let multicast_addr = VirtualAddr { link, peer: None };
        let endpoint_id = node
            .engine
            .enable_endpoint(link_name, multicast_addr, config)
            .expect("enable_endpoint should not fail against a virtual transport");
        node.link_endpoint.insert(link, endpoint_id);
    }

    /// Drops only the `from -> to` direction on `link` (§8 scenario 3).
    pub fn partition_one_way(&mut self, link: LinkId, from: &str, to: &str) {
        self.medium.block(link, self.id_of(from), self.id_of(to));
    }

    pub fn heal(&mut self, link: LinkId, from: &str, to: &str) {
        self.medium.unblock(link, self.id_of(from), self.id_of(to));
    }

    /// Advances the shared virtual clock by `dt_ms` and pumps one `poll` for
    /// every node, delivering whatever the medium queued up through the
    /// previous tick. Returns every node's emitted events, keyed by name, for
    /// tests that want to assert on them directly.
    pub fn tick(&mut self, dt_ms: u64) -> HashMap<String, Vec<EngineEvent>> {
        self.now += dt_ms;
        let mut inboxes: HashMap<NodeId, Vec<(LinkId, NodeId, Vec<u8>)>> = HashMap::new();
        self.medium.drain_into(&mut inboxes);

        let mut results = HashMap::new();
        let now = self.now;
        for (name, node) in self.nodes.iter_mut() {
            let datagrams = inboxes
                .remove(&node.id)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|(link, from, bytes)| {
                    node.link_endpoint.get(&link).map(|endpoint_id| {
                        (
                            *endpoint_id,
                            VirtualAddr {
                                link,
                                peer: Some(from),
                            },
                            bytes,
                        )
                    })
                })
                .collect();
            let mut events = PortEvents::new(now);
            events.datagrams = datagrams;
            let emitted = node.engine.poll(events);
            results.insert(name.clone(), emitted);
        }
        results
    }

    /// Ticks `count` times of `dt_ms` each, ignoring the per-tick event
    /// batches (for tests that only care about the end state).
    pub fn run_for(&mut self, dt_ms: u64, count: u32) {
        for _ in 0..count {
            self.tick(dt_ms);
        }
    }

    /// Ticks in `dt_ms` steps, up to `max_ticks` times, until every named
    /// node reports the same `network_hash`. Returns `true` if convergence
    /// was reached within the budget.
    pub fn run_until_converged(&mut self, names: &[&str], dt_ms: u64, max_ticks: u32) -> bool {
        for _ in 0..max_ticks {
            self.tick(dt_ms);
            let hashes: Vec<_> = names
                .iter()
                .map(|name| self.engine_mut(name).network_hash())
                .collect();
            if hashes.windows(2).all(|w| w[0] == w[1]) {
                return true;
            }
        }
        false
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
