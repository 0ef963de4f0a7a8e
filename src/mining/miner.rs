//! Proof-of-work engine for the ledger
//!
//! The search walks the nonce space upwards from the block's current nonce
//! until the block hash satisfies the difficulty predicate.

use crate::core::Block;
use crate::crypto::meets_difficulty;
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Default mining difficulty (number of '0' characters required)
pub const DEFAULT_DIFFICULTY: usize = 2;

/// Mining statistics
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hash rate (hashes per second)
    pub hash_rate: f64,
}

impl MiningStats {
    fn new(hash_attempts: u64, start: Instant) -> Self {
        let time_ms = start.elapsed().as_millis();
        let hash_rate = if time_ms > 0 {
            (hash_attempts as f64) / (time_ms as f64 / 1000.0)
        } else {
            hash_attempts as f64
        };

        Self {
            hash_attempts,
            time_ms,
            hash_rate,
        }
    }
}

/// Miner for sealing blocks
#[derive(Debug, Clone, Copy)]
pub struct Miner {
    pub difficulty: usize,
}

impl Default for Miner {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl Miner {
    /// Create a new miner
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    /// Mine the block. Runs until a valid nonce is found.
    pub fn mine(&self, block: Block) -> (Block, MiningStats) {
        let never = AtomicBool::new(false);
        match self.mine_with_cancel(block, &never) {
            Some(result) => result,
            None => unreachable!("mining cannot be cancelled without a signal"),
        }
    }

    /// Mine the block, giving up when `cancel` is set
    pub fn mine_with_cancel(
        &self,
        mut block: Block,
        cancel: &AtomicBool,
    ) -> Option<(Block, MiningStats)> {
        let start = Instant::now();
        let mut attempts = 0u64;

        info!("Mining block with difficulty {}...", self.difficulty);

        loop {
            if cancel.load(Ordering::Relaxed) {
                info!("Mining cancelled after {} attempts", attempts);
                return None;
            }

            // The starting nonce itself is never tested
            block.set_nonce(block.nonce.wrapping_add(1));
            attempts += 1;

            if meets_difficulty(&block.hash, self.difficulty) {
                break;
            }
        }

        let stats = MiningStats::new(attempts, start);

        info!(
            "Block {} mined in {}ms ({} attempts, {:.2} H/s)",
            block.hash, stats.time_ms, stats.hash_attempts, stats.hash_rate
        );

        Some((block, stats))
    }

    /// Mine on a blocking thread so async tasks keep running
    ///
    /// Returns `None` if the task was cancelled through `cancel` or panicked.
    pub async fn mine_detached(
        &self,
        block: Block,
        cancel: Arc<AtomicBool>,
    ) -> Option<(Block, MiningStats)> {
        let miner = *self;
        match tokio::task::spawn_blocking(move || miner.mine_with_cancel(block, &cancel)).await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Mining task failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calculate_hash;
    use crate::crypto::sha256_hex;

    fn sample_block() -> Block {
        Block::genesis(vec![
            "AddVehicle: WDDGF7HB8DA832917".to_string(),
            "TransferOwnership: WDDGF7HB8DA832917".to_string(),
            "AddVehicle: WP0CA298X2L001306".to_string(),
        ])
    }

    #[test]
    fn test_miner() {
        let miner = Miner::new(2);
        let (block, stats) = miner.mine(sample_block());

        let reversed: String = block.hash.chars().rev().collect();
        assert!(reversed.ends_with("00"));
        assert!(block.is_valid_pow(2));
        assert!(block.nonce >= 1);
        assert_eq!(stats.hash_attempts, block.nonce);
    }

    #[test]
    fn test_mined_hash_consistent() {
        let (block, _) = Miner::new(1).mine(sample_block());

        assert!(block.verify_hash());
        assert_eq!(
            block.hash,
            calculate_hash(&block.previous_hash, &block.merkle_root, block.nonce)
        );
        let record = format!("{}{}{}", block.previous_hash, block.merkle_root, block.nonce);
        assert_eq!(block.hash, sha256_hex(record.as_bytes()));
    }

    #[test]
    fn test_zero_difficulty_takes_one_attempt() {
        let (block, stats) = Miner::new(0).mine(sample_block());
        assert_eq!(block.nonce, 1);
        assert_eq!(stats.hash_attempts, 1);
    }

    #[test]
    fn test_mining_deterministic() {
        let miner = Miner::new(2);
        let (a, _) = miner.mine(sample_block());
        let (b, _) = miner.mine(sample_block());
        assert_eq!(a, b);
    }

    #[test]
    fn test_mine_with_cancel() {
        let cancel = AtomicBool::new(true);
        assert!(Miner::new(2).mine_with_cancel(sample_block(), &cancel).is_none());
    }

    #[tokio::test]
    async fn test_mine_detached() {
        let cancel = Arc::new(AtomicBool::new(false));
        let result = Miner::new(1).mine_detached(sample_block(), cancel).await;

        let (block, _) = result.expect("mining should finish");
        assert!(block.is_valid_pow(1));
    }
}
