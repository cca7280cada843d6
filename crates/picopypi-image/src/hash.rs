//! SHA-256 content hashing.

use picopypi_common::types::Sha256Digest;
use sha2::{Digest, Sha256};

/// Hashes a sequence of byte slices, each prefixed with its length so
/// that different splits of the same bytes do not collide.
#[must_use]
pub fn hash_parts(parts: &[&[u8]]) -> Sha256Digest {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let out: [u8; 32] = hasher.finalize().into();
    Sha256Digest::from_bytes(&out)
}
