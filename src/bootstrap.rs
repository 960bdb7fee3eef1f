//! Pool bootstrap workflow.
//!
//! Launches a pool end to end: token provisioning, fee-tier configuration,
//! pool creation, and the initial liquidity deposit. Steps run strictly in
//! order and each waits for its predecessor's confirmation; resource
//! creation is conditional on a derived-address existence check, so a
//! rerun after a partial failure picks up where the chain state says it
//! should. Any terminal failure aborts the run and names the step it
//! happened in.

use crate::dlmm::constants::lb_clmm_program_id;
use crate::dlmm::derive;
use crate::dlmm::instructions::{
    self, AddLiquidityAccounts, InitializeLbPairAccounts, PresetParameters,
};
use crate::dlmm::pool::PoolHandle;
use crate::dlmm::Cluster;
use crate::planner::{self, Rounding, StrategyKind};
use crate::setup::TokenProvisioner;
use crate::tx_engine::rpc::LedgerRpc;
use crate::tx_engine::{ReliabilityEngine, SubmitPolicy};
use crate::wallet::{ephemeral_identity, WalletManager};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Workflow steps, in execution order. Reported in failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    TokenSetup,
    PresetParameters,
    PoolCreation,
    PoolHandle,
    LiquidityPlan,
    InitialLiquidity,
}

impl std::fmt::Display for BootstrapStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::TokenSetup => "token-setup",
            Self::PresetParameters => "preset-parameters",
            Self::PoolCreation => "pool-creation",
            Self::PoolHandle => "pool-handle",
            Self::LiquidityPlan => "liquidity-plan",
            Self::InitialLiquidity => "initial-liquidity",
        };
        write!(f, "{name}")
    }
}

#[derive(Error, Debug)]
pub enum BootstrapError {
    /// A step failed; carries the step name and the underlying cause.
    #[error("bootstrap failed at {step}: {source}")]
    Step {
        step: BootstrapStep,
        #[source]
        source: anyhow::Error,
    },

    /// The pool-creation transaction confirmed but no account exists at
    /// the locally derived pool address. The two derivations must agree.
    #[error("no pool account at derived address {derived} after confirmed creation")]
    PoolAddressMismatch { derived: Pubkey },
}

impl BootstrapError {
    fn at<E: Into<anyhow::Error>>(step: BootstrapStep) -> impl FnOnce(E) -> Self {
        move |err| Self::Step {
            step,
            source: err.into(),
        }
    }
}

/// Inputs for one pool launch.
#[derive(Debug, Clone)]
pub struct LaunchParams {
    /// X mint to reuse; a fresh mint is created when absent.
    pub token_x_mint: Option<Pubkey>,
    pub token_x_decimals: u8,
    /// Supply minted to the funder when the X mint is created.
    pub initial_supply_x: u64,
    pub token_y_mint: Pubkey,
    pub bin_step: u16,
    pub fee_bps: u16,
    pub initial_price: f64,
    pub range_interval: u32,
    pub strategy: StrategyKind,
    pub budget_x: u64,
    pub budget_y: u64,
}

/// Everything a launch creates, for downstream use. Nothing is persisted.
#[derive(Debug, Clone)]
pub struct LaunchHandles {
    pub pool: Pubkey,
    pub preset_parameter: Pubkey,
    pub token_x: Pubkey,
    pub token_y: Pubkey,
    /// Single-use identity that signed the position account.
    pub position: Pubkey,
}

/// Sequences a pool launch against one deployment namespace.
///
/// Holds no per-run state; concurrent launches for different token pairs
/// may share one instance.
pub struct PoolBootstrap<R: LedgerRpc> {
    rpc: Arc<R>,
    engine: ReliabilityEngine<R>,
    program_id: Pubkey,
}

impl<R: LedgerRpc> PoolBootstrap<R> {
    pub fn new(rpc: Arc<R>, policy: SubmitPolicy, cluster: Cluster) -> Self {
        let engine = ReliabilityEngine::new(rpc.clone(), policy);
        Self {
            rpc,
            engine,
            program_id: lb_clmm_program_id(cluster),
        }
    }

    /// Program this instance derives addresses against.
    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    /// Run the full launch. Returns the created resource handles, or the
    /// first terminal failure with the step it occurred in.
    pub async fn run(
        &self,
        funder: &WalletManager,
        params: &LaunchParams,
    ) -> Result<LaunchHandles, BootstrapError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("bootstrap", %run_id, funder = %funder.pubkey());
        self.run_inner(funder, params).instrument(span).await
    }

    async fn run_inner(
        &self,
        funder: &WalletManager,
        params: &LaunchParams,
    ) -> Result<LaunchHandles, BootstrapError> {
        let provisioner = TokenProvisioner::new(&*self.rpc, &self.engine);

        // token setup
        let (token_x, minted_fresh) = match params.token_x_mint {
            Some(mint) => (mint, false),
            None => {
                let mint = provisioner
                    .create_mint(funder, params.token_x_decimals)
                    .await
                    .map_err(BootstrapError::at(BootstrapStep::TokenSetup))?;
                (mint, true)
            }
        };
        let token_y = params.token_y_mint;
        let user_token_x = provisioner
            .ensure_token_account(funder, &funder.pubkey(), &token_x)
            .await
            .map_err(BootstrapError::at(BootstrapStep::TokenSetup))?;
        let user_token_y = provisioner
            .ensure_token_account(funder, &funder.pubkey(), &token_y)
            .await
            .map_err(BootstrapError::at(BootstrapStep::TokenSetup))?;
        if minted_fresh {
            provisioner
                .mint_supply(funder, &token_x, &user_token_x, params.initial_supply_x)
                .await
                .map_err(BootstrapError::at(BootstrapStep::TokenSetup))?;
        }
        info!(%token_x, %token_y, "token setup complete");

        // preset parameters, skipped when already configured
        let base_factor = planner::base_factor_from_fee_bps(params.bin_step, params.fee_bps)
            .map_err(BootstrapError::at(BootstrapStep::PresetParameters))?;
        let preset_parameter =
            derive::derive_preset_parameter(params.bin_step, base_factor, &self.program_id)
                .map_err(BootstrapError::at(BootstrapStep::PresetParameters))?;
        let preset_exists = self
            .rpc
            .get_account(&preset_parameter)
            .await
            .map_err(BootstrapError::at(BootstrapStep::PresetParameters))?
            .is_some();
        if preset_exists {
            info!(%preset_parameter, "preset parameters already configured");
        } else {
            let preset = PresetParameters::with_defaults(params.bin_step, base_factor);
            let instruction = instructions::initialize_preset_parameter(
                &self.program_id,
                &preset_parameter,
                &funder.pubkey(),
                &preset,
            );
            self.engine
                .send_and_confirm(&[instruction], &funder.pubkey(), &[funder.keypair()])
                .await
                .into_result()
                .map_err(BootstrapError::at(BootstrapStep::PresetParameters))?;
            info!(%preset_parameter, bin_step = params.bin_step, base_factor, "preset parameters initialized");
        }

        // pool creation; the derived address and the on-chain derivation
        // must agree, checked below
        let pool =
            derive::derive_lb_pair(&token_x, &token_y, params.bin_step, base_factor, &self.program_id)
                .map_err(BootstrapError::at(BootstrapStep::PoolCreation))?;
        let reserve_x = derive::derive_reserve(&pool, &token_x, &self.program_id);
        let reserve_y = derive::derive_reserve(&pool, &token_y, &self.program_id);
        let oracle = derive::derive_oracle(&pool, &self.program_id);

        let pool_exists = self
            .rpc
            .get_account(&pool)
            .await
            .map_err(BootstrapError::at(BootstrapStep::PoolCreation))?
            .is_some();
        if pool_exists {
            info!(%pool, "pool already exists, skipping creation");
        } else {
            let opening_id =
                planner::bin_id_from_price(params.initial_price, params.bin_step, Rounding::Down)
                    .map_err(BootstrapError::at(BootstrapStep::PoolCreation))?;
            let accounts = InitializeLbPairAccounts {
                lb_pair: pool,
                token_mint_x: token_x,
                token_mint_y: token_y,
                reserve_x,
                reserve_y,
                oracle,
                preset_parameter,
                funder: funder.pubkey(),
            };
            let instruction = instructions::initialize_lb_pair(
                &self.program_id,
                &accounts,
                opening_id,
                params.bin_step,
            );
            self.engine
                .send_and_confirm(&[instruction], &funder.pubkey(), &[funder.keypair()])
                .await
                .into_result()
                .map_err(BootstrapError::at(BootstrapStep::PoolCreation))?;

            let created = self
                .rpc
                .get_account(&pool)
                .await
                .map_err(BootstrapError::at(BootstrapStep::PoolCreation))?
                .is_some();
            if !created {
                return Err(BootstrapError::PoolAddressMismatch { derived: pool });
            }
            info!(%pool, opening_id, "pool created");
        }

        // pool handle: read current on-chain state
        let handle = PoolHandle::load(&*self.rpc, pool)
            .await
            .map_err(BootstrapError::at(BootstrapStep::PoolHandle))?;

        // liquidity plan from the pool's current price
        let active_id = handle.active_bin_id();
        let range = planner::plan_range(active_id, params.range_interval, params.strategy.balance)
            .map_err(BootstrapError::at(BootstrapStep::LiquidityPlan))?;
        let (amount_x, amount_y) =
            planner::plan_amounts(params.strategy, params.budget_x, params.budget_y)
                .map_err(BootstrapError::at(BootstrapStep::LiquidityPlan))?;
        info!(
            active_id,
            min_bin_id = range.min_bin_id,
            max_bin_id = range.max_bin_id,
            amount_x,
            amount_y,
            "liquidity planned"
        );

        // initial liquidity, signed by the funder and a fresh single-use
        // position identity
        let position = ephemeral_identity();
        let accounts = AddLiquidityAccounts {
            position: position.pubkey(),
            lb_pair: pool,
            user_token_x,
            user_token_y,
            reserve_x: handle.state.reserve_x,
            reserve_y: handle.state.reserve_y,
            token_mint_x: token_x,
            token_mint_y: token_y,
            owner: funder.pubkey(),
            bin_arrays: derive::bin_arrays_for_range(&pool, &range, &self.program_id),
        };
        let instruction = instructions::initialize_position_and_add_liquidity(
            &self.program_id,
            &accounts,
            &range,
            amount_x,
            amount_y,
            params.strategy,
        );
        self.engine
            .send_and_confirm(
                &[instruction],
                &funder.pubkey(),
                &[funder.keypair(), &position],
            )
            .await
            .into_result()
            .map_err(BootstrapError::at(BootstrapStep::InitialLiquidity))?;
        info!(position = %position.pubkey(), "initial liquidity deposited");

        Ok(LaunchHandles {
            pool,
            preset_parameter,
            token_x,
            token_y,
            position: position.pubkey(),
        })
    }
}
