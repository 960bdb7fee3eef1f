//! poolforge - bin-liquidity pool launcher for Solana
//!
//! This library exposes the core modules for testing and integration
//! purposes: the reliability engine, the bootstrap workflow, and the pure
//! planning/derivation helpers they build on.

pub mod bootstrap;
pub mod config;
pub mod dlmm;
pub mod planner;
pub mod setup;
pub mod swap;
pub mod test_utils;
pub mod tx_engine;
pub mod wallet;

// Re-export commonly used types
pub use solana_sdk::{pubkey::Pubkey, signature::Signature};
