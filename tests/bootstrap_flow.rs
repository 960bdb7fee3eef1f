//! End-to-end bootstrap workflow tests against the in-memory ledger.

use poolforge::bootstrap::{BootstrapError, LaunchParams, PoolBootstrap};
use poolforge::dlmm::constants::{lb_clmm_program_id, Cluster};
use poolforge::dlmm::derive::{derive_lb_pair, derive_preset_parameter};
use poolforge::dlmm::instructions::instruction_discriminator;
use poolforge::dlmm::pool::LbPairState;
use poolforge::planner::{StrategyBalance, StrategyKind, StrategyShape};
use poolforge::test_utils::MockLedger;
use poolforge::tx_engine::SubmitPolicy;
use poolforge::wallet::WalletManager;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::sync::Arc;
use std::time::Duration;

const BIN_STEP: u16 = 100;
const FEE_BPS: u16 = 10;
const BASE_FACTOR: u16 = 1_000;

fn fast_policy() -> SubmitPolicy {
    SubmitPolicy {
        confirm_poll: Duration::from_millis(1),
        ..SubmitPolicy::default()
    }
}

fn launch_params(token_x: Pubkey, token_y: Pubkey) -> LaunchParams {
    LaunchParams {
        token_x_mint: Some(token_x),
        token_x_decimals: 9,
        initial_supply_x: 1_000_000_000_000_000,
        token_y_mint: token_y,
        bin_step: BIN_STEP,
        fee_bps: FEE_BPS,
        initial_price: 2.0,
        range_interval: 10,
        strategy: StrategyKind {
            shape: StrategyShape::Spot,
            balance: StrategyBalance::OneSidedX,
        },
        budget_x: 100_000_000_000,
        budget_y: 0,
    }
}

fn insert_pool_account(
    ledger: &MockLedger,
    program_id: &Pubkey,
    pool: Pubkey,
    token_x: Pubkey,
    token_y: Pubkey,
) {
    let state = LbPairState {
        bin_step: BIN_STEP,
        base_factor: BASE_FACTOR,
        active_id: 70,
        token_x_mint: token_x,
        token_y_mint: token_y,
        reserve_x: Pubkey::new_unique(),
        reserve_y: Pubkey::new_unique(),
        status: 0,
    };
    ledger.insert_account(pool, state.to_bytes(), *program_id);
}

fn contains_instruction(ledger: &MockLedger, name: &str) -> bool {
    let tag = instruction_discriminator(name);
    ledger.submissions().iter().any(|tx| {
        tx.message
            .instructions
            .iter()
            .any(|ix| ix.data.len() >= 8 && ix.data[..8] == tag)
    })
}

#[tokio::test]
async fn skips_preset_initialization_when_account_exists() {
    let program_id = lb_clmm_program_id(Cluster::MainnetBeta);
    let ledger = Arc::new(MockLedger::new());
    let funder = WalletManager::from_keypair(Keypair::new());
    let token_x = Pubkey::new_unique();
    let token_y = Pubkey::new_unique();

    let preset = derive_preset_parameter(BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    ledger.insert_account(preset, vec![1u8; 64], program_id);
    let pool = derive_lb_pair(&token_x, &token_y, BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    insert_pool_account(&ledger, &program_id, pool, token_x, token_y);

    let bootstrap = PoolBootstrap::new(ledger.clone(), fast_policy(), Cluster::MainnetBeta);
    let handles = bootstrap
        .run(&funder, &launch_params(token_x, token_y))
        .await
        .unwrap();

    assert_eq!(handles.pool, pool);
    assert_eq!(handles.preset_parameter, preset);
    assert_eq!(handles.token_x, token_x);
    assert_eq!(handles.token_y, token_y);

    // nothing submitted an initialize_preset_parameter instruction
    assert!(!contains_instruction(&ledger, "initialize_preset_parameter"));
    assert!(!contains_instruction(&ledger, "initialize_lb_pair"));
    assert!(contains_instruction(
        &ledger,
        "initialize_position_and_add_liquidity_by_strategy"
    ));

    // two token accounts plus the liquidity deposit
    assert_eq!(ledger.submission_count(), 3);
}

#[tokio::test]
async fn initializes_preset_when_missing() {
    let program_id = lb_clmm_program_id(Cluster::MainnetBeta);
    let ledger = Arc::new(MockLedger::new());
    let funder = WalletManager::from_keypair(Keypair::new());
    let token_x = Pubkey::new_unique();
    let token_y = Pubkey::new_unique();

    let pool = derive_lb_pair(&token_x, &token_y, BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    insert_pool_account(&ledger, &program_id, pool, token_x, token_y);

    let bootstrap = PoolBootstrap::new(ledger.clone(), fast_policy(), Cluster::MainnetBeta);
    bootstrap
        .run(&funder, &launch_params(token_x, token_y))
        .await
        .unwrap();

    assert!(contains_instruction(&ledger, "initialize_preset_parameter"));
    assert_eq!(ledger.submission_count(), 4);
}

#[tokio::test]
async fn liquidity_deposit_is_signed_by_funder_and_position() {
    let program_id = lb_clmm_program_id(Cluster::MainnetBeta);
    let ledger = Arc::new(MockLedger::new());
    let funder = WalletManager::from_keypair(Keypair::new());
    let token_x = Pubkey::new_unique();
    let token_y = Pubkey::new_unique();

    let preset = derive_preset_parameter(BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    ledger.insert_account(preset, vec![1u8; 64], program_id);
    let pool = derive_lb_pair(&token_x, &token_y, BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    insert_pool_account(&ledger, &program_id, pool, token_x, token_y);

    let bootstrap = PoolBootstrap::new(ledger.clone(), fast_policy(), Cluster::MainnetBeta);
    let handles = bootstrap
        .run(&funder, &launch_params(token_x, token_y))
        .await
        .unwrap();

    // position identity differs from every other handle
    assert_ne!(handles.position, funder.pubkey());
    assert_ne!(handles.position, handles.pool);

    let submissions = ledger.submissions();
    let deposit = submissions.last().unwrap();
    assert_eq!(deposit.signatures.len(), 2);
}

#[tokio::test]
async fn missing_pool_after_creation_is_a_consistency_error() {
    let ledger = Arc::new(MockLedger::new());
    let funder = WalletManager::from_keypair(Keypair::new());
    let token_x = Pubkey::new_unique();
    let token_y = Pubkey::new_unique();

    // no pool account is ever materialized, so the post-creation check
    // cannot find the derived address
    let bootstrap = PoolBootstrap::new(ledger.clone(), fast_policy(), Cluster::MainnetBeta);
    let err = bootstrap
        .run(&funder, &launch_params(token_x, token_y))
        .await
        .unwrap_err();

    let program_id = lb_clmm_program_id(Cluster::MainnetBeta);
    let derived = derive_lb_pair(&token_x, &token_y, BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    match err {
        BootstrapError::PoolAddressMismatch { derived: reported } => {
            assert_eq!(reported, derived);
        }
        other => panic!("expected PoolAddressMismatch, got {other}"),
    }
    // the creation transaction itself was submitted
    assert!(contains_instruction(&ledger, "initialize_lb_pair"));
}

#[tokio::test]
async fn failures_name_the_step_they_happened_in() {
    let program_id = lb_clmm_program_id(Cluster::MainnetBeta);
    let ledger = Arc::new(MockLedger::new());
    let funder = WalletManager::from_keypair(Keypair::new());
    let token_x = Pubkey::new_unique();
    let token_y = Pubkey::new_unique();

    let preset = derive_preset_parameter(BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    ledger.insert_account(preset, vec![1u8; 64], program_id);
    let pool = derive_lb_pair(&token_x, &token_y, BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    insert_pool_account(&ledger, &program_id, pool, token_x, token_y);

    // zero budgets make the planning step reject the launch
    let mut params = launch_params(token_x, token_y);
    params.budget_x = 0;
    params.budget_y = 0;

    let bootstrap = PoolBootstrap::new(ledger.clone(), fast_policy(), Cluster::MainnetBeta);
    let err = bootstrap.run(&funder, &params).await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("liquidity-plan"), "unexpected error: {text}");
    assert!(text.contains("zero"), "unexpected error: {text}");

    // aborted before any deposit reached the network
    assert!(!contains_instruction(
        &ledger,
        "initialize_position_and_add_liquidity_by_strategy"
    ));
}

#[tokio::test]
async fn exhausted_retries_abort_the_workflow_with_the_step_name() {
    use poolforge::tx_engine::RpcError;

    let program_id = lb_clmm_program_id(Cluster::MainnetBeta);
    let ledger = Arc::new(MockLedger::new());
    let funder = WalletManager::from_keypair(Keypair::new());
    let token_x = Pubkey::new_unique();
    let token_y = Pubkey::new_unique();

    let preset = derive_preset_parameter(BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    ledger.insert_account(preset, vec![1u8; 64], program_id);
    let pool = derive_lb_pair(&token_x, &token_y, BIN_STEP, BASE_FACTOR, &program_id).unwrap();
    insert_pool_account(&ledger, &program_id, pool, token_x, token_y);

    // every attempt of the first submission (the X token account) fails
    for _ in 0..3 {
        ledger.queue_submit_failure(RpcError::Transport("connection refused".into()));
    }

    let bootstrap = PoolBootstrap::new(ledger.clone(), fast_policy(), Cluster::MainnetBeta);
    let err = bootstrap
        .run(&funder, &launch_params(token_x, token_y))
        .await
        .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("token-setup"), "unexpected error: {text}");
    // three failed attempts, then the workflow stopped
    assert_eq!(ledger.submission_count(), 3);
}
