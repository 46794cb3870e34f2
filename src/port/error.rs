use thiserror::Error;

/// Errors the platform transport can report back to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// `enable_endpoint` could not set up the underlying socket/link. Fatal
    /// configuration errors are the one category the engine surfaces
    /// directly from the call site rather than through the subscription bus
    /// (§7).
    #[error("failed to initialize endpoint {endpoint}: {reason}")]
    InitFailed { endpoint: String, reason: String },

    /// A send failed transiently. The engine counts it and otherwise ignores
    /// it — trickle will retry (§7 `TransportError`).
    #[error("transient send failure on endpoint {endpoint}: {reason}")]
    SendFailed { endpoint: u32, reason: String },
}
