use thiserror::Error;

use crate::tlv::DecodeError as TlvDecodeError;

/// Errors produced while interpreting a raw TLV as a protocol [`Message`](super::Message).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageDecodeError {
    /// The outer framing was not even valid TLV.
    #[error("malformed TLV framing: {0}")]
    Tlv(#[from] TlvDecodeError),

    /// A recognized message type's value was too short for its fixed fields.
    #[error("message type {tlv_type} value too short: got {got} byte(s), need at least {need}")]
    ValueTooShort {
        tlv_type: u16,
        got: usize,
        need: usize,
    },

    /// An opaque (agent-defined) TLV was encountered where the engine
    /// expected one of its own message types; not itself a protocol error —
    /// callers that don't want to carry opaque payloads can treat this as
    /// one.
    #[error("unrecognized engine message type {0} (agent-defined range)")]
    Opaque(u16),
}
