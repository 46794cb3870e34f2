use thiserror::Error;

use crate::endpoint::EndpointError;
use crate::publisher::PublisherError;
use crate::store::StoreError;

/// Aggregated error surfaced at the `Engine` API boundary, mirroring the
/// teacher crate's pattern of a top-level error enum with `#[from]`
/// conversions over each component's own error type (e.g.
/// `ConnectionError` aggregating `EncoderError`/`DecoderError`).
///
/// Per §7's propagation policy, this is only ever returned by the
/// synchronous collaborator-facing calls (`add_tlv`, `enable_endpoint`, …);
/// `poll` never returns an error for transient network/decode problems —
/// those are counted in [`crate::EngineStats`] and surfaced as observable
/// state changes, if any, through the subscription bus instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error(transparent)]
    Publisher(#[from] PublisherError),
}
