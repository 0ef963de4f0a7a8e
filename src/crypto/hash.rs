//! Cryptographic hashing utilities for the ledger
//!
//! Provides the SHA-256 digest used for transactions, merkle nodes and
//! block hashes, plus the proof-of-work difficulty predicate.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes SHA-256 hash and returns it as a lowercase hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Checks if a hex hash meets the difficulty target.
///
/// The hash is reversed and must then end with `difficulty` `'0'` characters.
pub fn meets_difficulty(hash_hex: &str, difficulty: usize) -> bool {
    let reversed: String = hash_hex.chars().rev().collect();
    let target = "0".repeat(difficulty);
    reversed.ends_with(&target)
}
