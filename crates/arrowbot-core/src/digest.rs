//! Stable content addressing.
//!
//! All content-derived keys go through SHA-256 so the same text maps to the
//! same key across processes and restarts.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `text`.
pub fn content_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Cache key for a generated answer to `message`.
///
/// Keyed on the verbatim message only, so sessions share cached answers.
pub fn response_cache_key(message: &str) -> String {
    format!("response:{}", content_digest(message))
}

/// Identifier of a knowledge snippet. Re-ingesting identical text yields the
/// same id and overwrites the previous entry.
pub fn knowledge_id(text: &str) -> String {
    let digest = content_digest(text);
    format!("doc_{}", &digest[..16])
}

/// First eight digest bytes of `text` as a big-endian integer.
pub fn digest_u64(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}
