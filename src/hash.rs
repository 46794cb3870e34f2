//! Content-addressable digest used for `content_hash` and `network_hash`.
//!
//! BLAKE3's 256-bit output is truncated to 128 bits, fixed-width across
//! every deployment.

use crate::types::Digest;

/// Hashes an ordered sequence of byte slices as if they were concatenated,
/// without requiring the caller to actually concatenate them first.
///
/// Used both for a node's canonical TLV sequence (`content_hash`) and for the
/// network-wide `(id, content_hash, update_number)` tuples (`network_hash`).
pub fn hash_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Digest {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    let full = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&full.as_bytes()[..16]);
    Digest(out)
}
