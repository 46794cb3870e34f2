//! The narrow ports the engine uses to reach the outside world (§2, §6).
//!
//! The engine is generic over the link-local address type (`Addr`) a given
//! deployment uses — the platform layer that actually owns interfaces and
//! addresses is explicitly out of scope (§1 Non-goals), so this crate never
//! hardcodes `IpAddr` or any other concrete representation.
//!
//! `send`/`recv` are reached through [`Transport`]; `now()` has no trait of
//! its own — the host reads its own clock and hands the reading straight to
//! [`crate::PortEvents::now_ms`] on each `poll` call, since the engine never
//! needs to read the clock on its own initiative. A `schedule_at`/`cancel`
//! timer contract is instead recast as an internally-owned timer queue
//! inside [`crate::Engine`] — since the engine is driven by one cooperative
//! `poll()` call rather than spawning its own thread, there is nothing
//! external to schedule against. The equivalent external contract becomes
//! [`crate::Engine::next_wakeup`]: the engine tells its host the latest time
//! it should be polled again, instead of registering a callback with the
//! host.

pub mod error;

pub use error::PortError;

use crate::types::EndpointId;

/// Send/receive primitives for one named link, reached once per endpoint.
pub trait Transport {
    /// Opaque link-local address type (e.g. an IPv6 link-local address, a
    /// test harness's virtual node id — the engine never inspects it).
    type Addr: Clone + Eq + std::fmt::Debug;

    /// Sends `bytes` on `endpoint` to `dst`. Transient failures are swallowed
    /// by the caller (§7 `TransportError`); trickle/retry logic, not the
    /// transport, is responsible for eventually re-sending.
    fn send(&mut self, endpoint: EndpointId, dst: &Self::Addr, bytes: &[u8]) -> Result<(), PortError>;
}
