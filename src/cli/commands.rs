//! CLI commands for the ledger
//!
//! Console reports over the ledger and the peer registry, plus the demo
//! genesis block the binary mines on startup.

use crate::core::{Block, Ledger};
use crate::mining::Miner;
use crate::network::PeerRegistry;
use crate::vehicle;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// VIN used by the default history report
pub const DEMO_VIN: &str = "WDDGF7HB8DA832917";

/// Transactions of the demo genesis block
pub fn demo_transactions() -> Vec<String> {
    vec![
        vehicle::add_vehicle(DEMO_VIN, "Mercedes", "C63", 2013, "Murtaza Haider"),
        vehicle::transfer_ownership(DEMO_VIN, "Murtaza Haider", "Abdullah Tariq"),
        vehicle::add_vehicle("WP0CA298X2L001306", "Porsche", "Carerra GT", 2002, "Abdullah Gill"),
        vehicle::transfer_ownership("WP0CA298X2L001306", "Abdullah Gill", "Murtaza Haider"),
        vehicle::add_vehicle("JT2JA82J1R0019362", "Toyota", "Supra", 1995, "Eesha Shafqat"),
        vehicle::transfer_ownership("JT2JA82J1R0019362", "Eesha Shafqat", "Abdullah Gill"),
        vehicle::record_maintenance(DEMO_VIN, "Oil change and brake check"),
        vehicle::report_accident("WP0CA298X2L001306", "Minor scratch on rear bumper"),
    ]
}

/// Build, mine and append a block on top of the ledger
pub fn cmd_mine(ledger: &mut Ledger, miner: &Miner, transactions: Vec<String>) -> Block {
    let block = Block::new(transactions, ledger.latest_hash());

    println!("⛏️  Mining block {} (difficulty {})", ledger.len(), miner.difficulty);
    let (block, stats) = miner.mine(block);

    println!("   ├─ Hash: {}", block.hash);
    println!("   ├─ Nonce: {}", block.nonce);
    println!("   ├─ Time: {}ms", stats.time_ms);
    println!("   └─ Hash rate: {:.2} H/s", stats.hash_rate);

    ledger.append(block.clone());
    block
}

/// Print every block with its merkle tree
pub fn display_blocks(ledger: &Ledger) {
    for block in ledger.iter() {
        println!(
            "Block - Previous Hash: {}, Merkle Root: {}, Nonce: {}, Current Hash: {}",
            block.previous_hash, block.merkle_root, block.nonce, block.hash
        );
        display_merkle_tree(&block.merkle_tree);
    }
}

/// Print the blocks as pretty JSON
pub fn display_blocks_json(ledger: &Ledger) -> CliResult<()> {
    let blocks: Vec<&Block> = ledger.iter().collect();
    println!("{}", serde_json::to_string_pretty(&blocks)?);
    Ok(())
}

pub fn display_merkle_tree(levels: &[Vec<String>]) {
    if levels.is_empty() {
        println!("No Merkle Tree to display.");
        return;
    }

    println!("Merkle Tree:");
    for (level, nodes) in levels.iter().enumerate() {
        println!("Level {}: {}", level, nodes.join(" "));
    }
    println!();
}

/// Print the known peers
pub fn display_network(registry: &PeerRegistry) {
    println!("🌐 P2P Network:");
    for peer in registry.snapshot() {
        println!("   Node IP: {}, Port: {}", peer.host, peer.port);
    }
}

/// Print every transaction mentioning a VIN
pub fn history_report(ledger: &Ledger, vin: &str) -> usize {
    println!("📜 History Report for VIN {}:", vin);
    let mut count = 0;
    for tx in ledger.find_transactions_containing(vin) {
        println!("   {}", tx);
        count += 1;
    }
    count
}
