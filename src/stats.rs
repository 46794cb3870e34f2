//! Monotonic counters for observability that falls outside the subscription
//! bus — dropped/malformed messages, and send-side traffic volume.

/// Counters the engine bumps but never resets; a collaborator wanting a
/// rate samples [`Engine::stats`](crate::Engine::stats) at two points in
/// time and subtracts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub decode_errors: u64,
    pub hash_mismatches: u64,
    pub oversize_count: u64,
    pub transport_errors: u64,
    pub conflicting_origins: u64,
    pub multicast_sent: u64,
    pub unicast_sent: u64,
}

impl EngineStats {
    pub(crate) fn note_decode_error(&mut self) {
        self.decode_errors += 1;
    }
    pub(crate) fn note_hash_mismatch(&mut self) {
        self.hash_mismatches += 1;
    }
    pub(crate) fn note_oversize(&mut self) {
        self.oversize_count += 1;
    }
    pub(crate) fn note_transport_error(&mut self) {
        self.transport_errors += 1;
    }
    pub(crate) fn note_conflicting_origin(&mut self) {
        self.conflicting_origins += 1;
    }
    pub(crate) fn note_multicast_sent(&mut self) {
        self.multicast_sent += 1;
    }
    pub(crate) fn note_unicast_sent(&mut self) {
        self.unicast_sent += 1;
    }
}
