use thiserror::Error;

/// Errors produced while decoding a byte blob into a canonical TLV sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer bytes remained than the 4-byte TLV header requires.
    #[error("truncated TLV header: {remaining} byte(s) remaining, need at least 4")]
    TruncatedHeader { remaining: usize },

    /// The header's `length` field claims more value bytes than remain.
    #[error("truncated TLV value: type {tlv_type} declares length {length} but only {remaining} byte(s) remain")]
    TruncatedValue {
        tlv_type: u16,
        length: u16,
        remaining: usize,
    },

    /// Two adjacent TLVs compared equal or out of ascending order.
    #[error("TLV sequence not strictly ascending at index {index}")]
    NotAscending { index: usize },

    /// The same encoded TLV appeared twice.
    #[error("duplicate TLV at index {index}")]
    Duplicate { index: usize },
}
