//! Pseudo-identity derivation for like deduplication.
//!
//! Likes are deduplicated per caller without accounts: the caller's IP
//! address is hashed with a deployment-wide salt into a short opaque digest
//! that keys the per-user like counts. The digest is deterministic for a
//! given (ip, salt) pair and is never reversed.

use sha2::{Digest, Sha256};

/// Length of the hex digest used as a pseudo-identity key.
const USER_HASH_LEN: usize = 8;

/// Derive the opaque per-caller key used in `likes_by_user`.
pub fn user_hash(ip: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(ip.as_bytes());
    let digest = hasher.finalize();

    let mut hash = hex::encode(digest);
    hash.truncate(USER_HASH_LEN);
    hash
}
