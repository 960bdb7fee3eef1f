//! Program ids and protocol constants for the bin-liquidity (DLMM) program.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Basis point denominator used by fee and slippage math.
pub const BASIS_POINT_MAX: u32 = 10_000;

/// Number of bins stored per bin-array account.
pub const MAX_BIN_PER_ARRAY: i32 = 70;

/// Extreme bin ids supported by the program.
pub const MAX_BIN_ID: i32 = 43_690;
pub const MIN_BIN_ID: i32 = -43_690;

// Default preset-parameter values for a newly configured fee tier.
pub const DEFAULT_FILTER_PERIOD: u16 = 30;
pub const DEFAULT_DECAY_PERIOD: u16 = 600;
pub const DEFAULT_REDUCTION_FACTOR: u16 = 5_000;
pub const DEFAULT_VARIABLE_FEE_CONTROL: u32 = 40_000;
pub const DEFAULT_PROTOCOL_SHARE: u16 = 0;
pub const DEFAULT_MAX_VOLATILITY_ACCUMULATOR: u32 = 350_000;

/// Deployment namespace to derive addresses against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cluster {
    MainnetBeta,
    Devnet,
    Localnet,
}

impl std::fmt::Display for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cluster::MainnetBeta => write!(f, "mainnet-beta"),
            Cluster::Devnet => write!(f, "devnet"),
            Cluster::Localnet => write!(f, "localnet"),
        }
    }
}

static LB_CLMM_MAINNET: Lazy<Pubkey> = Lazy::new(|| {
    Pubkey::from_str("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo").expect("valid program id")
});
static LB_CLMM_DEVNET: Lazy<Pubkey> = Lazy::new(|| {
    Pubkey::from_str("LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo").expect("valid program id")
});

/// Resolve the pool program id for a cluster.
///
/// Localnet deployments mirror the devnet program id.
pub fn lb_clmm_program_id(cluster: Cluster) -> Pubkey {
    match cluster {
        Cluster::MainnetBeta => *LB_CLMM_MAINNET,
        Cluster::Devnet | Cluster::Localnet => *LB_CLMM_DEVNET,
    }
}
