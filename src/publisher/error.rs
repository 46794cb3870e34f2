use thiserror::Error;

/// Errors surfaced directly to the calling collaborator by [`super::LocalPublisher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublisherError {
    /// `add_tlv` of a record whose encoded form already exists in our
    /// published set (§4.2, §8 idempotence law).
    #[error("TLV already published: type {tlv_type}")]
    DuplicateTlv { tlv_type: u16 },
}
