//! Vehicle-Ledger: a minimal vehicle history ledger in Rust
//!
//! This crate provides:
//! - Merkle trees over free-text transactions
//! - Proof-of-work sealed blocks in an append-only ledger
//! - Gossip-based peer discovery through a bootstrap node
//! - Vehicle record transactions and history reports
//!
//! # Example
//!
//! ```rust
//! use vehicle_ledger::core::{Block, Ledger};
//! use vehicle_ledger::mining::Miner;
//!
//! let mut ledger = Ledger::new();
//! let block = Block::genesis(vec!["AddVehicle: WDDGF7HB8DA832917".to_string()]);
//!
//! let (block, stats) = Miner::new(1).mine(block);
//! println!("Mined {} in {} attempts", block.hash, stats.hash_attempts);
//! ledger.append(block);
//!
//! assert_eq!(ledger.find_transactions_containing("WDDGF7HB8DA832917").count(), 1);
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod network;
pub mod vehicle;

// Re-export commonly used types
pub use crate::core::{Block, Ledger, SharedLedger};
pub use crate::crypto::{build_merkle_tree, sha256_hex, MerkleTree};
pub use crate::mining::{Miner, MiningStats, DEFAULT_DIFFICULTY};
pub use crate::network::{Node, NodeConfig, PeerAddress, PeerError, PeerRegistry};
