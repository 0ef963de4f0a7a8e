//! Block implementation for the ledger
//!
//! A block holds an ordered list of opaque transactions, the merkle tree
//! built over them and the proof-of-work seal.

use crate::crypto::{build_merkle_tree, meets_difficulty, sha256_hex};
use serde::{Deserialize, Serialize};

/// Calculate the hash of a block from its sealed fields
pub fn calculate_hash(previous_hash: &str, merkle_root: &str, nonce: u64) -> String {
    let record = format!("{}{}{}", previous_hash, merkle_root, nonce);
    sha256_hex(record.as_bytes())
}

/// A block in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Transactions in insertion order
    pub transactions: Vec<String>,
    /// Hash of the previous block, empty for genesis
    pub previous_hash: String,
    /// Nonce used for proof of work
    pub nonce: u64,
    /// Merkle root of all transactions
    pub merkle_root: String,
    /// Every level of the merkle tree, leaves first
    pub merkle_tree: Vec<Vec<String>>,
    /// Block hash, kept in sync with the nonce
    pub hash: String,
}

impl Block {
    /// Create a new block (unmined)
    pub fn new(transactions: Vec<String>, previous_hash: impl Into<String>) -> Self {
        let previous_hash = previous_hash.into();
        let tree = build_merkle_tree(&transactions);
        let hash = calculate_hash(&previous_hash, &tree.root, 0);

        Self {
            transactions,
            previous_hash,
            nonce: 0,
            merkle_root: tree.root,
            merkle_tree: tree.levels,
            hash,
        }
    }

    /// Create an unmined genesis block (empty previous hash)
    pub fn genesis(transactions: Vec<String>) -> Self {
        Self::new(transactions, String::new())
    }

    /// Set the nonce and recompute the hash
    pub fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
        self.hash = calculate_hash(&self.previous_hash, &self.merkle_root, nonce);
    }

    /// Check if the proof of work is valid for a difficulty
    pub fn is_valid_pow(&self, difficulty: usize) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    /// Verify the block's merkle root
    pub fn verify_merkle_root(&self) -> bool {
        let tree = build_merkle_tree(&self.transactions);
        tree.root == self.merkle_root && tree.levels == self.merkle_tree
    }

    /// Verify the block hash
    pub fn verify_hash(&self) -> bool {
        self.hash == calculate_hash(&self.previous_hash, &self.merkle_root, self.nonce)
    }

    /// Get number of transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_genesis(&self) -> bool {
        self.previous_hash.is_empty()
    }
}
