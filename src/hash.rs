//! Content fingerprinting for cache keys.
//!
//! Uploads are identified by a 128-bit MD5 digest of the raw bytes. The
//! fingerprint only needs to be collision-resistant enough for cache
//! correctness, not cryptographically secure.

use std::fmt;

use md5::{Digest, Md5};

/// 128-bit content fingerprint of an uploaded image.
///
/// Deterministic: the same byte sequence always produces the same
/// fingerprint. Displays as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Get the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Hex-encode the digest (lowercase, 32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Compute the fingerprint of a byte sequence.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    Fingerprint(hasher.finalize().into())
}

// =============================================================================
// Tests
// =============================================================================
