//! poolforge - bin-liquidity pool launcher
//!
//! Bootstraps a pool on a Solana cluster (token mints, fee tier, pool
//! account, initial liquidity) and executes swaps against it. Every
//! submission goes through a bounded-retry reliability engine with
//! blockhash-expiry handling.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use poolforge::bootstrap::{LaunchParams, PoolBootstrap};
use poolforge::config::Config;
use poolforge::dlmm::{lb_clmm_program_id, PoolHandle};
use poolforge::swap::SwapOrchestrator;
use poolforge::tx_engine::{SolanaRpc, TxOutcome};
use poolforge::wallet::WalletManager;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bootstrap a pool and seed its initial liquidity
    Launch,

    /// Quote and execute a swap against an existing pool
    Swap {
        /// Pool address to trade against
        #[arg(long)]
        pool: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();
    init_logging(args.verbose);

    info!("🚀 Starting poolforge");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!("📋 Loading configuration from: {}", args.config);
    let config = Config::load(&args.config).context("Failed to load configuration")?;

    info!(
        "🔑 Initializing wallet from: {}",
        config.wallet.keypair_path
    );
    let wallet =
        WalletManager::from_file(&config.wallet.keypair_path).context("Failed to load wallet")?;
    info!("💼 Wallet address: {}", wallet.pubkey());

    info!(
        "🌐 RPC endpoint: {} (cluster: {})",
        config.rpc.url, config.network.cluster
    );
    let rpc = Arc::new(SolanaRpc::new(
        config.rpc.url.clone(),
        Duration::from_secs(config.rpc.timeout_secs),
        config.rpc.commitment,
    ));
    let policy = config.submit.policy(config.rpc.commitment);

    match args.command {
        Command::Launch => {
            let params = launch_params(&config)?;
            let bootstrap = PoolBootstrap::new(rpc, policy, config.network.cluster);
            let handles = bootstrap.run(&wallet, &params).await?;

            info!("✅ Pool launched");
            info!("   Pool:             {}", handles.pool);
            info!("   Preset parameter: {}", handles.preset_parameter);
            info!("   Token X:          {}", handles.token_x);
            info!("   Token Y:          {}", handles.token_y);
            info!("   Position:         {}", handles.position);
        }
        Command::Swap { pool } => {
            let address = Pubkey::from_str(&pool).context("Invalid pool address")?;
            let handle = PoolHandle::load(&*rpc, address)
                .await
                .context("Failed to load pool")?;
            info!(
                "📈 Pool {} active bin {} price {:.6}",
                handle.address,
                handle.active_bin_id(),
                handle.active_price()
            );

            let program_id = lb_clmm_program_id(config.network.cluster);
            let orchestrator = SwapOrchestrator::new(rpc, policy, program_id);
            let quote = orchestrator.quote(
                &handle,
                config.swap.amount_in,
                config.swap.swap_for_y,
                config.swap.slippage_bps,
            )?;
            info!(
                "💱 Quote: {} in, {} expected out (floor {})",
                quote.amount_in, quote.expected_out, quote.min_out_amount
            );

            match orchestrator.execute(&handle, &quote, &wallet).await {
                TxOutcome::Confirmed(signature) => {
                    info!("✅ Swap confirmed: {}", signature);
                }
                TxOutcome::Expired { cutoff } => {
                    warn!("⏱️ Swap expired before confirmation (cutoff height {cutoff})");
                    anyhow::bail!("swap expired before confirmation");
                }
                TxOutcome::Failed(err) => {
                    return Err(err).context("Swap failed");
                }
            }
        }
    }

    Ok(())
}

fn launch_params(config: &Config) -> Result<LaunchParams> {
    let pool = &config.pool;
    let token_x_mint = pool
        .token_x_mint
        .as_deref()
        .map(Pubkey::from_str)
        .transpose()
        .context("Invalid token_x_mint")?;
    let token_y_mint = match pool.token_y_mint.as_deref() {
        Some(mint) => Pubkey::from_str(mint).context("Invalid token_y_mint")?,
        None => spl_token::native_mint::id(),
    };
    Ok(LaunchParams {
        token_x_mint,
        token_x_decimals: pool.token_x_decimals,
        initial_supply_x: pool.initial_supply_x,
        token_y_mint,
        bin_step: pool.bin_step,
        fee_bps: pool.fee_bps,
        initial_price: pool.initial_price,
        range_interval: pool.range_interval,
        strategy: pool.strategy(),
        budget_x: pool.budget_x,
        budget_y: pool.budget_y,
    })
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
