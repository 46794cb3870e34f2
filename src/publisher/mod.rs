//! Local Publisher (§4.2) — the mutable view of *our* node: a sorted
//! multiset of TLVs that local agents add and remove.

pub mod error;

pub use error::PublisherError;

use std::collections::HashMap;

use crate::tlv::Tlv;
use crate::types::{TimeMs, UpdateNumber};

/// Opaque handle returned by [`LocalPublisher::add_tlv`], used to remove the
/// same record later.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TlvHandle(u64);

/// The local node's in-memory published set, plus enough bookkeeping to know
/// when a coalesced republish is owed.
pub struct LocalPublisher {
    tlvs: Vec<Tlv>,
    handles: HashMap<TlvHandle, Tlv>,
    next_handle: u64,
    update_number: UpdateNumber,
    /// Set by any successful mutation; cleared once the engine commits a
    /// republish (re-hash + store upsert + immediate flood).
    republish_due_since: Option<TimeMs>,
}

/// What a caller needs after a successful mutation: the single TLV that
/// changed (for the immediate `on_local_tlv_change` notification) and
/// whether a coalesce timer needs to be (re)armed.
pub struct MutationEffect {
    pub tlv: Tlv,
    pub added: bool,
    /// `true` the first time in a coalescing burst; `false` on subsequent
    /// mutations within the same still-pending window, so the engine does
    /// not reset an already-armed timer (§4.2 pacing).
    pub should_arm_timer: bool,
}

impl LocalPublisher {
    pub fn new() -> Self {
        Self {
            tlvs: Vec::new(),
            handles: HashMap::new(),
            next_handle: 0,
            update_number: 0,
            republish_due_since: None,
        }
    }

    pub fn tlvs(&self) -> &[Tlv] {
        &self.tlvs
    }

    pub fn update_number(&self) -> UpdateNumber {
        self.update_number
    }

    pub fn has_pending_republish(&self) -> bool {
        self.republish_due_since.is_some()
    }

    /// Time the currently-pending republish burst started, if any — used by
    /// the engine to decide whether the coalescing window (§4.2) has
    /// elapsed yet.
    pub fn republish_due_since(&self) -> Option<TimeMs> {
        self.republish_due_since
    }

    pub fn add_tlv(
        &mut self,
        tlv: Tlv,
        now: TimeMs,
    ) -> Result<(TlvHandle, MutationEffect), PublisherError> {
        if self.tlvs.binary_search(&tlv).is_ok() {
            return Err(PublisherError::DuplicateTlv {
                tlv_type: tlv.tlv_type,
            });
        }
        let pos = self.tlvs.partition_point(|existing| existing < &tlv);
        self.tlvs.insert(pos, tlv.clone());
        let handle = TlvHandle(self.next_handle);
        self.next_handle += 1;
        self.handles.insert(handle, tlv.clone());
        self.update_number += 1;
        let should_arm_timer = self.republish_due_since.is_none();
        if should_arm_timer {
            self.republish_due_since = Some(now);
        }
        Ok((
            handle,
            MutationEffect {
                tlv,
                added: true,
                should_arm_timer,
            },
        ))
    }

    /// Removes a previously-added TLV. A second removal of the same (already
    /// consumed) handle is a documented no-op (§8 idempotence law), returning
    /// `None`.
    pub fn remove_tlv(&mut self, handle: TlvHandle, now: TimeMs) -> Option<MutationEffect> {
        let tlv = self.handles.remove(&handle)?;
        if let Ok(pos) = self.tlvs.binary_search(&tlv) {
            self.tlvs.remove(pos);
        }
        self.update_number += 1;
        let should_arm_timer = self.republish_due_since.is_none();
        if should_arm_timer {
            self.republish_due_since = Some(now);
        }
        Some(MutationEffect {
            tlv,
            added: false,
            should_arm_timer,
        })
    }

    /// Called by the engine when the coalesce timer fires. Clears the
    /// pending flag and returns the current snapshot to publish.
    pub fn take_republish_snapshot(&mut self) -> (Vec<Tlv>, UpdateNumber) {
        self.republish_due_since = None;
        (self.tlvs.clone(), self.update_number)
    }
}

impl Default for LocalPublisher {
    fn default() -> Self {
        Self::new()
    }
}
