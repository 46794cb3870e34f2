use std::fmt;

/// Fixed-width opaque identifier for a participating node.
///
/// The engine never interprets the bytes beyond comparing and hashing them;
/// collaborators (e.g. the platform layer picking a hardware address) choose
/// how the id is seeded.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub [u8; 8]);

impl NodeId {
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId(")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A small integer unique within a single node, naming one of its endpoints.
pub type EndpointId = u32;

/// Monotonically increasing counter chosen by a record's originator.
pub type UpdateNumber = u32;

/// Monotonic milliseconds, as returned by the clock port. Never wall-clock.
pub type TimeMs = u64;

/// 16-byte digest used for both `content_hash` (per-node) and `network_hash`
/// (network-wide). Produced by truncating a BLAKE3 digest; see
/// [`crate::hash`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest(pub [u8; 16]);

impl Digest {
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest(")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}
