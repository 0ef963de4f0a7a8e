//! Merkle tree construction for block transactions
//!
//! Leaves are the hex digests of the transactions. Each level pairs adjacent
//! entries and hashes their concatenated hex text. An unpaired last entry is
//! carried to the next level as-is, it is never duplicated.

use super::hash::sha256_hex;
use serde::{Deserialize, Serialize};

/// A fully built merkle tree, every level kept for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    /// Root digest, empty when there were no transactions
    pub root: String,
    /// Level 0 holds the leaf digests, the last level holds only the root
    pub levels: Vec<Vec<String>>,
}

impl MerkleTree {
    /// Number of levels in the tree
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Build the merkle tree over an ordered list of transactions
pub fn build_merkle_tree<S: AsRef<str>>(transactions: &[S]) -> MerkleTree {
    if transactions.is_empty() {
        return MerkleTree::default();
    }

    let mut current_level: Vec<String> = transactions
        .iter()
        .map(|tx| sha256_hex(tx.as_ref().as_bytes()))
        .collect();
    let mut levels = vec![current_level.clone()];

    while current_level.len() > 1 {
        let next_level: Vec<String> = current_level
            .chunks(2)
            .map(|chunk| match chunk {
                [left, right] => sha256_hex(format!("{}{}", left, right).as_bytes()),
                // Odd level: carry the last digest up unchanged
                [single] => single.clone(),
                _ => unreachable!("chunks(2) yields one or two items"),
            })
            .collect();

        levels.push(next_level.clone());
        current_level = next_level;
    }

    MerkleTree {
        root: current_level.remove(0),
        levels,
    }
}

/// Calculate only the merkle root of a list of transactions
pub fn calculate_merkle_root<S: AsRef<str>>(transactions: &[S]) -> String {
    build_merkle_tree(transactions).root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(data: &str) -> String {
        sha256_hex(data.as_bytes())
    }

    #[test]
    fn test_empty_merkle_tree() {
        let txs: Vec<String> = vec![];
        let tree = build_merkle_tree(&txs);
        assert_eq!(tree.root, "");
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_merkle_root_single() {
        let tree = build_merkle_tree(&["tx1"]);
        assert_eq!(tree.root, h("tx1"));
        assert_eq!(tree.levels, vec![vec![h("tx1")]]);
    }

    #[test]
    fn test_merkle_root_two() {
        let tree = build_merkle_tree(&["a", "b"]);
        let expected = h(&format!("{}{}", h("a"), h("b")));
        assert_eq!(tree.root, expected);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_merkle_root_odd_carries_last() {
        let tree = build_merkle_tree(&["a", "b", "c"]);
        let ab = h(&format!("{}{}", h("a"), h("b")));

        assert_eq!(tree.levels[0], vec![h("a"), h("b"), h("c")]);
        assert_eq!(tree.levels[1], vec![ab.clone(), h("c")]);
        assert_eq!(tree.root, h(&format!("{}{}", ab, h("c"))));
        assert_eq!(tree.depth(), 3);

        // Duplicating the last leaf would give a different root
        let duplicated = h(&format!("{}{}", ab, h(&format!("{}{}", h("c"), h("c")))));
        assert_ne!(tree.root, duplicated);
    }

    #[test]
    fn test_merkle_depth_matches_log2() {
        for n in 1..=17usize {
            let txs: Vec<String> = (0..n).map(|i| format!("tx{}", i)).collect();
            let tree = build_merkle_tree(&txs);
            let expected = (n as f64).log2().ceil() as usize + 1;
            assert_eq!(tree.depth(), expected, "n = {}", n);
            assert_eq!(tree.levels.last().map(Vec::len), Some(1));
        }
    }

    #[test]
    fn test_merkle_deterministic() {
        let txs = vec!["AddVehicle: X", "TransferOwnership: X", "ReportAccident: X"];
        assert_eq!(build_merkle_tree(&txs), build_merkle_tree(&txs));
        assert_eq!(calculate_merkle_root(&txs), build_merkle_tree(&txs).root);
    }
}
