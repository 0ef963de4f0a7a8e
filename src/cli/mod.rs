//! Command-line reports and commands

pub mod commands;

pub use commands::*;
