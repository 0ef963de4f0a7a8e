//! Append-only ledger of sealed blocks
//!
//! The ledger owns the chain. It never validates linkage between blocks;
//! callers pass the previous hash when they build a block.

use crate::core::block::Block;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ledger handle shared between the miner and reporting tasks
pub type SharedLedger = Arc<RwLock<Ledger>>;

/// The main ledger structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh ledger for sharing across tasks
    pub fn shared() -> SharedLedger {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Append a sealed block
    pub fn append(&mut self, block: Block) {
        log::debug!(
            "Appending block {} ({} transactions)",
            block.hash,
            block.tx_count()
        );
        self.blocks.push(block);
    }

    /// Iterate over every block, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Block> + '_ {
        self.blocks.iter()
    }

    /// Iterate over the transactions containing `needle`, in block order and
    /// then in-block order
    pub fn find_transactions_containing<'a>(
        &'a self,
        needle: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.blocks
            .iter()
            .flat_map(|block| block.transactions.iter())
            .filter(move |tx| tx.contains(needle))
            .map(String::as_str)
    }

    /// Get a block by index
    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Hash of the last block, empty when the ledger has no blocks yet
    pub fn latest_hash(&self) -> String {
        self.blocks
            .last()
            .map(|block| block.hash.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIN: &str = "WDDGF7HB8DA832917";

    #[test]
    fn test_empty_ledger() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.latest_hash(), "");
        assert_eq!(ledger.iter().count(), 0);
    }

    #[test]
    fn test_append_keeps_order() {
        let mut ledger = Ledger::new();
        let genesis = Block::genesis(vec!["a".to_string()]);
        let next = Block::new(vec!["b".to_string()], genesis.hash.clone());

        ledger.append(genesis.clone());
        ledger.append(next.clone());

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.get(0), Some(&genesis));
        assert_eq!(ledger.latest_hash(), next.hash);
        let hashes: Vec<&str> = ledger.iter().map(|b| b.hash.as_str()).collect();
        assert_eq!(hashes, vec![genesis.hash.as_str(), next.hash.as_str()]);
    }

    #[test]
    fn test_find_transactions_containing() {
        let mut ledger = Ledger::new();
        let genesis = Block::genesis(vec![
            format!("AddVehicle: {}, Mercedes", VIN),
            "AddVehicle: WP0CA298X2L001306, Porsche".to_string(),
            format!("TransferOwnership: {}, From: A, To: B", VIN),
        ]);
        let next = Block::new(
            vec![
                "ReportAccident: WP0CA298X2L001306".to_string(),
                format!("RecordMaintenance: {}, Oil change", VIN),
            ],
            genesis.hash.clone(),
        );
        ledger.append(genesis);
        ledger.append(next);

        let found: Vec<&str> = ledger.find_transactions_containing(VIN).collect();
        assert_eq!(
            found,
            vec![
                format!("AddVehicle: {}, Mercedes", VIN),
                format!("TransferOwnership: {}, From: A, To: B", VIN),
                format!("RecordMaintenance: {}, Oil change", VIN),
            ]
        );
        assert_eq!(ledger.find_transactions_containing("JT2JA").count(), 0);
    }
}
