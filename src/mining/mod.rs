//! Mining module for block sealing

pub mod miner;

pub use miner::{Miner, MiningStats, DEFAULT_DIFFICULTY};
