//! Configuration module for the pool launcher.
//!
//! Configuration is loaded from a TOML file with defaults for everything
//! except the wallet path; the RPC endpoint can be overridden through the
//! `RPC_URL` environment variable.

use crate::dlmm::constants::Cluster;
use crate::planner::{StrategyBalance, StrategyKind, StrategyShape};
use crate::tx_engine::SubmitPolicy;
use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentLevel;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    pub rpc: RpcSettings,

    /// Target network namespace
    #[serde(default)]
    pub network: NetworkSettings,

    /// Wallet configuration
    pub wallet: WalletSettings,

    /// Submission and retry policy
    #[serde(default)]
    pub submit: SubmitSettings,

    /// Pool launch parameters
    #[serde(default)]
    pub pool: PoolSettings,

    /// Swap parameters
    #[serde(default)]
    pub swap: SwapSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcSettings {
    /// Endpoint URL. Overridden by `RPC_URL` when set.
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Commitment requested for reads and confirmations
    #[serde(default = "default_commitment")]
    pub commitment: CommitmentLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Cluster whose program deployment addresses are derived against
    #[serde(default = "default_cluster")]
    pub cluster: Cluster,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    /// Path to keypair file
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSettings {
    /// Attempts allowed per transaction, including the first
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Priority-fee bump in lamports, zero to disable
    #[serde(default = "default_priority_fee")]
    pub priority_fee_lamports: u64,

    /// Blocks shaved off the blockhash validity window
    #[serde(default = "default_expiry_margin")]
    pub expiry_margin_blocks: u64,

    /// Delay between confirmation polls in milliseconds
    #[serde(default = "default_confirm_poll_ms")]
    pub confirm_poll_ms: u64,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            priority_fee_lamports: default_priority_fee(),
            expiry_margin_blocks: default_expiry_margin(),
            confirm_poll_ms: default_confirm_poll_ms(),
        }
    }
}

impl SubmitSettings {
    /// Engine policy for these settings at the given commitment.
    pub fn policy(&self, commitment: CommitmentLevel) -> SubmitPolicy {
        SubmitPolicy {
            max_retries: self.max_retries,
            priority_fee_lamports: self.priority_fee_lamports,
            expiry_margin_blocks: self.expiry_margin_blocks,
            confirm_poll: Duration::from_millis(self.confirm_poll_ms),
            commitment,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Bin step in basis points
    #[serde(default = "default_bin_step")]
    pub bin_step: u16,

    /// Base fee in basis points
    #[serde(default = "default_fee_bps")]
    pub fee_bps: u16,

    /// Opening price, Y per X
    #[serde(default = "default_initial_price")]
    pub initial_price: f64,

    /// Deposit range half-width in bins
    #[serde(default = "default_range_interval")]
    pub range_interval: u32,

    /// Deposit distribution shape
    #[serde(default = "default_strategy_shape")]
    pub strategy_shape: StrategyShape,

    /// Which side(s) of the active bin the deposit funds
    #[serde(default = "default_strategy_balance")]
    pub strategy_balance: StrategyBalance,

    /// Deposit budget of token X, in base units
    #[serde(default = "default_budget_x")]
    pub budget_x: u64,

    /// Deposit budget of token Y, in base units
    #[serde(default)]
    pub budget_y: u64,

    /// Decimals for a freshly created X mint
    #[serde(default = "default_token_decimals")]
    pub token_x_decimals: u8,

    /// Supply minted to the funder when the X mint is created
    #[serde(default = "default_initial_supply")]
    pub initial_supply_x: u64,

    /// Existing X mint to reuse instead of creating one
    #[serde(default)]
    pub token_x_mint: Option<String>,

    /// Y-side mint; defaults to the wrapped native mint
    #[serde(default)]
    pub token_y_mint: Option<String>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            bin_step: default_bin_step(),
            fee_bps: default_fee_bps(),
            initial_price: default_initial_price(),
            range_interval: default_range_interval(),
            strategy_shape: default_strategy_shape(),
            strategy_balance: default_strategy_balance(),
            budget_x: default_budget_x(),
            budget_y: 0,
            token_x_decimals: default_token_decimals(),
            initial_supply_x: default_initial_supply(),
            token_x_mint: None,
            token_y_mint: None,
        }
    }
}

impl PoolSettings {
    pub fn strategy(&self) -> StrategyKind {
        StrategyKind {
            shape: self.strategy_shape,
            balance: self.strategy_balance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapSettings {
    /// Input amount in base units
    #[serde(default = "default_swap_amount")]
    pub amount_in: u64,

    /// Sell X for Y when true, Y for X otherwise
    #[serde(default)]
    pub swap_for_y: bool,

    /// Allowed slippage against the quoted output, in basis points
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            amount_in: default_swap_amount(),
            swap_for_y: false,
            slippage_bps: default_slippage_bps(),
        }
    }
}

// Default value functions
fn default_rpc_timeout() -> u64 {
    30
}
fn default_commitment() -> CommitmentLevel {
    CommitmentLevel::Finalized
}
fn default_cluster() -> Cluster {
    Cluster::MainnetBeta
}
fn default_max_retries() -> u32 {
    3
}
fn default_priority_fee() -> u64 {
    1_000_000
}
fn default_expiry_margin() -> u64 {
    150
}
fn default_confirm_poll_ms() -> u64 {
    400
}
fn default_bin_step() -> u16 {
    100
}
fn default_fee_bps() -> u16 {
    10
}
fn default_initial_price() -> f64 {
    2.0
}
fn default_range_interval() -> u32 {
    10
}
fn default_strategy_shape() -> StrategyShape {
    StrategyShape::Spot
}
fn default_strategy_balance() -> StrategyBalance {
    StrategyBalance::OneSidedX
}
fn default_budget_x() -> u64 {
    100_000_000_000
}
fn default_token_decimals() -> u8 {
    9
}
fn default_initial_supply() -> u64 {
    1_000_000_000_000_000
}
fn default_swap_amount() -> u64 {
    500_000_000_000
}
fn default_slippage_bps() -> u16 {
    10
}

impl Config {
    /// Load configuration from a TOML file and apply environment
    /// overrides.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RPC_URL") {
            if !url.is_empty() {
                self.rpc.url = url;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[rpc]
url = "https://api.mainnet-beta.solana.com"

[wallet]
keypair_path = "id.json"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.rpc.timeout_secs, 30);
        assert_eq!(config.rpc.commitment, CommitmentLevel::Finalized);
        assert_eq!(config.network.cluster, Cluster::MainnetBeta);
        assert_eq!(config.submit.max_retries, 3);
        assert_eq!(config.submit.expiry_margin_blocks, 150);
        assert_eq!(config.pool.bin_step, 100);
        assert_eq!(config.pool.fee_bps, 10);
        assert_eq!(config.pool.strategy_balance, StrategyBalance::OneSidedX);
        assert_eq!(config.swap.slippage_bps, 10);
    }

    #[test]
    fn strategy_tags_parse_kebab_case() {
        let toml_text = r#"
[rpc]
url = "http://localhost:8899"

[wallet]
keypair_path = "id.json"

[pool]
strategy_shape = "bid-ask"
strategy_balance = "one-sided-y"
"#;
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(config.pool.strategy_shape, StrategyShape::BidAsk);
        assert_eq!(config.pool.strategy_balance, StrategyBalance::OneSidedY);
    }

    #[test]
    fn submit_settings_build_policy() {
        let settings = SubmitSettings {
            max_retries: 5,
            priority_fee_lamports: 7,
            expiry_margin_blocks: 99,
            confirm_poll_ms: 250,
        };
        let policy = settings.policy(CommitmentLevel::Confirmed);
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.priority_fee_lamports, 7);
        assert_eq!(policy.expiry_margin_blocks, 99);
        assert_eq!(policy.confirm_poll, Duration::from_millis(250));
        assert_eq!(policy.commitment, CommitmentLevel::Confirmed);
    }
}
