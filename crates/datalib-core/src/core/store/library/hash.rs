//! Content hashing primitive.

use sha2::{Digest, Sha256};

use super::*;

/// Deterministic digest used as the storage key for a blob.
///
/// Implementations must return lowercase hex of at least three characters;
/// the shard layout consumes the first three as directory names. The
/// algorithm name is recorded in the index on creation and checked on every
/// open, so swapping hashers over an existing library is refused.
pub trait ContentHasher: Send + Sync {
    fn algorithm(&self) -> &'static str;

    fn digest(&self, bytes: &[u8]) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn algorithm(&self) -> &'static str {
        "sha256"
    }

    fn digest(&self, bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }
}

pub(super) fn validate_hash(hash: &str) -> Result<()> {
    let valid = hash.len() >= SHARD_DEPTH
        && hash
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if valid {
        Ok(())
    } else {
        Err(LibraryError::InvalidHash(hash.to_string()).into())
    }
}
