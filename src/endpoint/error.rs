use thiserror::Error;

use crate::port::PortError;

/// Errors surfaced by [`super::EndpointTable`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    /// `enable` was called for a name that is already enabled.
    #[error("endpoint '{name}' is already enabled")]
    AlreadyEnabled { name: String },

    /// `disable` (or a lookup) was called for a name/id we don't know.
    #[error("no such endpoint: {0}")]
    NotFound(String),

    /// The transport port could not bring the link up (§7, surfaced directly
    /// from `enable_endpoint` rather than through the subscription bus).
    #[error(transparent)]
    Port(#[from] PortError),
}
