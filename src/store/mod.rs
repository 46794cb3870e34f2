//! Node Store (§4.1) — the set of known nodes keyed by node identifier, each
//! carrying its latest published TLV blob, content hash, origination time,
//! update number, and reachability mark.

pub mod error;
pub mod node_record;

pub use error::StoreError;
pub use node_record::NodeRecord;

use std::collections::HashMap;

use crate::hash::hash_parts;
use crate::tlv::{self, Tlv};
use crate::types::{Digest, NodeId, TimeMs, UpdateNumber};

/// Outcome of a single [`NodeStore::upsert`] call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Our stored copy already had an equal-or-higher `(update_number,
    /// origination_time)`.
    Ignored,
}

/// The TLV-level effect of one `upsert`, in the canonical order callers must
/// replay to subscribers: all removals ascending, then all additions
/// ascending (§5 ordering guarantees).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TlvDiff {
    pub removed: Vec<Tlv>,
    pub added: Vec<Tlv>,
}

impl TlvDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Full result of an `upsert` call, enough for the flooding protocol and the
/// subscription bus to react without re-reading the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertEffect {
    pub outcome: UpsertOutcome,
    pub diff: TlvDiff,
    /// Set when this id had no prior record (a "node appeared" event).
    pub node_appeared: bool,
    /// Set when an equal `(update_number, origination_time)` carried a
    /// different `content_hash` than our stored copy — two nodes claiming
    /// the same identifier (§9 Open Question 3). The existing record is
    /// kept; this is reported, not silently overwritten.
    pub conflicting_origin: bool,
}

/// Result of a [`NodeStore::reap`] call for one removed node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapEffect {
    pub id: NodeId,
    pub removed_tlvs: Vec<Tlv>,
}

/// The set of known nodes, keyed by [`NodeId`], including our own.
pub struct NodeStore {
    own_id: NodeId,
    nodes: HashMap<NodeId, NodeRecord>,
    network_hash: Digest,
    network_hash_dirty: bool,
}

impl NodeStore {
    /// Creates a store seeded with an empty record for `own_id`, published
    /// for the first time at `now` with update number 0.
    pub fn new(own_id: NodeId, now: TimeMs) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(
            own_id,
            NodeRecord {
                id: own_id,
                tlvs: Vec::new(),
                content_hash: hash_parts(std::iter::empty()),
                origination_time: now,
                update_number: 0,
                last_reachable_at: now,
            },
        );
        Self {
            own_id,
            nodes,
            network_hash: hash_parts(std::iter::empty()),
            network_hash_dirty: true,
        }
    }

    pub fn own_id(&self) -> NodeId {
        self.own_id
    }

    pub fn get(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.values()
    }

    pub fn own(&self) -> &NodeRecord {
        // SAFETY/invariant: `own_id`'s record is inserted in `new` and only
        // ever replaced (never removed) by `republish_own`.
        self.nodes
            .get(&self.own_id)
            .expect("own node record always present")
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Decodes `blob` into a canonical TLV sequence and attempts to merge it
    /// in as node `id`'s latest version (§4.1). Used both for remote
    /// publishes arriving over the wire and to validate locally-sourced
    /// blobs through the same path.
    pub fn upsert(
        &mut self,
        id: NodeId,
        blob: &[u8],
        update_number: UpdateNumber,
        origination_time: TimeMs,
    ) -> Result<UpsertEffect, StoreError> {
        let tlvs = tlv::decode_canonical_sequence(blob)?;
        Ok(self.upsert_decoded(id, tlvs, update_number, origination_time))
    }

    /// As [`Self::upsert_decoded`], but first verifies `tlvs` actually hashes
    /// to `advertised_content_hash` — the check a full `NODE_STATE` publish
    /// must pass before it is allowed to replace anything (§4.4 rule 5, §7
    /// `HashMismatch`). Used for publishes arriving over the wire; locally
    /// produced TLV sequences go through [`Self::upsert_decoded`] directly
    /// since their hash is computed here, not advertised by a peer.
    pub fn upsert_verified(
        &mut self,
        id: NodeId,
        tlvs: Vec<Tlv>,
        update_number: UpdateNumber,
        origination_time: TimeMs,
        advertised_content_hash: Digest,
    ) -> Result<UpsertEffect, StoreError> {
        let computed = hash_node_tlvs(&tlvs);
        if computed != advertised_content_hash {
            return Err(StoreError::HashMismatch { node_id: id });
        }
        Ok(self.upsert_decoded(id, tlvs, update_number, origination_time))
    }

    /// As [`Self::upsert`], but takes an already-canonical TLV sequence
    /// (e.g. the Local Publisher's in-memory multiset, which is kept sorted
    /// at all times and never needs round-tripping through bytes).
    pub fn upsert_decoded(
        &mut self,
        id: NodeId,
        tlvs: Vec<Tlv>,
        update_number: UpdateNumber,
        origination_time: TimeMs,
    ) -> UpsertEffect {
        let new_content_hash = hash_node_tlvs(&tlvs);

        let new_key = (update_number, origination_time);

        match self.nodes.get(&id) {
            None => {
                let diff = TlvDiff {
                    removed: Vec::new(),
                    added: tlvs.clone(),
                };
                self.nodes.insert(
                    id,
                    NodeRecord {
                        id,
                        tlvs,
                        content_hash: new_content_hash,
                        origination_time,
                        update_number,
                        last_reachable_at: origination_time,
                    },
                );
                self.network_hash_dirty = true;
                UpsertEffect {
                    outcome: UpsertOutcome::Inserted,
                    diff,
                    node_appeared: true,
                    conflicting_origin: false,
                }
            }
            Some(existing) => {
                let existing_key = existing.version_key();
                if new_key < existing_key {
                    return UpsertEffect {
                        outcome: UpsertOutcome::Ignored,
                        diff: TlvDiff::default(),
                        node_appeared: false,
                        conflicting_origin: false,
                    };
                }
                if new_key == existing_key {
                    if new_content_hash == existing.content_hash {
                        return UpsertEffect {
                            outcome: UpsertOutcome::Ignored,
                            diff: TlvDiff::default(),
                            node_appeared: false,
                            conflicting_origin: false,
                        };
                    }
                    // Same version, different content: two origins claiming
                    // the same id. Keep the existing record, report it.
                    return UpsertEffect {
                        outcome: UpsertOutcome::Ignored,
                        diff: TlvDiff::default(),
                        node_appeared: false,
                        conflicting_origin: true,
                    };
                }
                // new_key > existing_key: Replaced.
                let diff = diff_tlvs(&existing.tlvs, &tlvs);
                let last_reachable_at = existing.last_reachable_at;
                self.nodes.insert(
                    id,
                    NodeRecord {
                        id,
                        tlvs,
                        content_hash: new_content_hash,
                        origination_time,
                        update_number,
                        last_reachable_at,
                    },
                );
                // update_number/content_hash changed even if the TLV diff
                // happens to be empty (a republish with identical content).
                self.network_hash_dirty = true;
                UpsertEffect {
                    outcome: UpsertOutcome::Replaced,
                    diff,
                    node_appeared: false,
                    conflicting_origin: false,
                }
            }
        }
    }

    /// Removes every id in `ids` (used by the GC after the reachability
    /// grace period), returning the TLVs each carried so the caller can
    /// notify subscribers.
    pub fn reap(&mut self, ids: &[NodeId]) -> Vec<ReapEffect> {
        let mut effects = Vec::with_capacity(ids.len());
        for id in ids {
            if *id == self.own_id {
                continue; // never reap ourselves
            }
            if let Some(record) = self.nodes.remove(id) {
                self.network_hash_dirty = true;
                effects.push(ReapEffect {
                    id: *id,
                    removed_tlvs: record.tlvs,
                });
            }
        }
        effects
    }

    /// Marks a node as currently reachable, refreshing its grace-period
    /// clock. Called by the reachability BFS, not by upsert itself.
    pub fn mark_reachable(&mut self, id: &NodeId, now: TimeMs) {
        if let Some(record) = self.nodes.get_mut(id) {
            record.last_reachable_at = now;
        }
    }

    /// Recomputes `network_hash` lazily, only when dirty, restricted to
    /// `reachable` ids in ascending order.
    pub fn network_hash(&mut self, reachable: &[NodeId]) -> Digest {
        if self.network_hash_dirty {
            let mut ids: Vec<NodeId> = reachable.to_vec();
            ids.sort();
            ids.dedup();
            let mut parts: Vec<Vec<u8>> = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(record) = self.nodes.get(id) {
                    let mut buf = Vec::with_capacity(8 + 16 + 4);
                    buf.extend_from_slice(id.as_bytes());
                    buf.extend_from_slice(record.content_hash.as_bytes());
                    buf.extend_from_slice(&record.update_number.to_be_bytes());
                    parts.push(buf);
                }
            }
            self.network_hash = hash_parts(parts.iter().map(|v| v.as_slice()));
            self.network_hash_dirty = false;
        }
        self.network_hash
    }

    pub fn mark_network_hash_dirty(&mut self) {
        self.network_hash_dirty = true;
    }
}

fn hash_node_tlvs(tlvs: &[Tlv]) -> Digest {
    let encoded = tlv::encode_canonical_sequence(tlvs);
    hash_parts(std::iter::once(encoded.as_slice()))
}

/// Merges two canonically-ordered TLV sequences into the set removed from
/// `old` and the set added in `new`, each kept in ascending canonical order
/// (§5 ordering guarantee: "all removals then all additions, both ascending").
fn diff_tlvs(old: &[Tlv], new: &[Tlv]) -> TlvDiff {
    let mut removed = Vec::new();
    let mut added = Vec::new();
    let mut i = 0;
    let mut j = 0;
    while i < old.len() && j < new.len() {
        match old[i].cmp(&new[j]) {
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                removed.push(old[i].clone());
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                added.push(new[j].clone());
                j += 1;
            }
        }
    }
    removed.extend_from_slice(&old[i..]);
    added.extend_from_slice(&new[j..]);
    TlvDiff { removed, added }
}
