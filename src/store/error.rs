use thiserror::Error;

use crate::tlv::DecodeError;

/// Errors surfaced by [`super::NodeStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The blob handed to `upsert` did not decode into a canonical TLV
    /// sequence (§4.1).
    #[error("cannot upsert: {0}")]
    Decode(#[from] DecodeError),

    /// A full NODE_STATE's advertised `content_hash` did not match the hash
    /// of the TLVs it carried (§4.4 rule 5, §7 `HashMismatch`).
    #[error("content hash mismatch for node {node_id:?}")]
    HashMismatch { node_id: crate::types::NodeId },
}
