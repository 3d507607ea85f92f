//! Hashing utilities for stable name disambiguation.

use sha2::{Digest, Sha256};

/// Compute SHA256 hash of a string, hex encoded.
pub fn sha256_str(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// A short, stable hex digest of `s` (first `len` hex digits of its SHA256).
pub fn short_hash(s: &str, len: usize) -> String {
    let mut digest = sha256_str(s);
    digest.truncate(len);
    digest
}
