//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing
//! - The proof-of-work difficulty predicate
//! - Merkle tree calculations

pub mod hash;
pub mod merkle;

pub use hash::{meets_difficulty, sha256, sha256_hex};
pub use merkle::{build_merkle_tree, calculate_merkle_root, MerkleTree};
