//! Core ledger components
//!
//! This module contains the fundamental building blocks:
//! - Blocks (merkle anchored, proof-of-work sealed)
//! - Ledger (append-only chain with history queries)

pub mod block;
pub mod ledger;

pub use block::{calculate_hash, Block};
pub use ledger::{Ledger, SharedLedger};
