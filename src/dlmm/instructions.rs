//! Instruction builders for the bin-liquidity program.
//!
//! The program exposes an anchor-style ABI: each instruction is tagged with
//! the first eight bytes of the sha256 of its namespaced name, followed by
//! little-endian encoded arguments. Builders here are deterministic and
//! allocation-light; account ordering matches the on-chain definitions.

use crate::dlmm::constants::{
    DEFAULT_DECAY_PERIOD, DEFAULT_FILTER_PERIOD, DEFAULT_MAX_VOLATILITY_ACCUMULATOR,
    DEFAULT_PROTOCOL_SHARE, DEFAULT_REDUCTION_FACTOR, DEFAULT_VARIABLE_FEE_CONTROL, MAX_BIN_ID,
    MIN_BIN_ID,
};
use crate::planner::{BinRange, StrategyBalance, StrategyKind, StrategyShape};
use sha2::{Digest, Sha256};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{system_program, sysvar};

/// Fee-tier parameters stored in a preset-parameter account. Immutable once
/// the account exists on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetParameters {
    pub bin_step: u16,
    pub base_factor: u16,
    pub filter_period: u16,
    pub decay_period: u16,
    pub reduction_factor: u16,
    pub variable_fee_control: u32,
    pub protocol_share: u16,
    pub max_bin_id: i32,
    pub min_bin_id: i32,
    pub max_volatility_accumulator: u32,
}

impl PresetParameters {
    /// Standard volatility/fee defaults for a new tier.
    pub fn with_defaults(bin_step: u16, base_factor: u16) -> Self {
        Self {
            bin_step,
            base_factor,
            filter_period: DEFAULT_FILTER_PERIOD,
            decay_period: DEFAULT_DECAY_PERIOD,
            reduction_factor: DEFAULT_REDUCTION_FACTOR,
            variable_fee_control: DEFAULT_VARIABLE_FEE_CONTROL,
            protocol_share: DEFAULT_PROTOCOL_SHARE,
            max_bin_id: MAX_BIN_ID,
            min_bin_id: MIN_BIN_ID,
            max_volatility_accumulator: DEFAULT_MAX_VOLATILITY_ACCUMULATOR,
        }
    }
}

/// Eight-byte tag for a global instruction.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    namespaced_discriminator("global", name)
}

/// Eight-byte tag prefixed to account data.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    namespaced_discriminator("account", name)
}

fn namespaced_discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("{namespace}:{name}").as_bytes());
    let mut tag = [0u8; 8];
    tag.copy_from_slice(&digest[..8]);
    tag
}

/// Wire code for a strategy selection. One-sided X and Y share a code; the
/// funded side is implied by which deposit amount is nonzero.
pub fn strategy_code(kind: StrategyKind) -> u8 {
    let shape = match kind.shape {
        StrategyShape::Spot => 0,
        StrategyShape::Curve => 1,
        StrategyShape::BidAsk => 2,
    };
    let balance = match kind.balance {
        StrategyBalance::OneSidedX | StrategyBalance::OneSidedY => 0,
        StrategyBalance::Balanced => 1,
        StrategyBalance::Imbalanced => 2,
    };
    balance * 3 + shape
}

/// Create the preset-parameter account for a fee tier.
pub fn initialize_preset_parameter(
    program_id: &Pubkey,
    preset_parameter: &Pubkey,
    admin: &Pubkey,
    params: &PresetParameters,
) -> Instruction {
    let mut data = instruction_discriminator("initialize_preset_parameter").to_vec();
    data.extend_from_slice(&params.bin_step.to_le_bytes());
    data.extend_from_slice(&params.base_factor.to_le_bytes());
    data.extend_from_slice(&params.filter_period.to_le_bytes());
    data.extend_from_slice(&params.decay_period.to_le_bytes());
    data.extend_from_slice(&params.reduction_factor.to_le_bytes());
    data.extend_from_slice(&params.variable_fee_control.to_le_bytes());
    data.extend_from_slice(&params.protocol_share.to_le_bytes());
    data.extend_from_slice(&params.max_bin_id.to_le_bytes());
    data.extend_from_slice(&params.min_bin_id.to_le_bytes());
    data.extend_from_slice(&params.max_volatility_accumulator.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*preset_parameter, false),
            AccountMeta::new(*admin, true),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data,
    }
}

/// Accounts required to create a pool.
#[derive(Debug, Clone)]
pub struct InitializeLbPairAccounts {
    pub lb_pair: Pubkey,
    pub token_mint_x: Pubkey,
    pub token_mint_y: Pubkey,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub oracle: Pubkey,
    pub preset_parameter: Pubkey,
    pub funder: Pubkey,
}

/// Create a pool for a token pair and fee tier, opening at `active_id`.
pub fn initialize_lb_pair(
    program_id: &Pubkey,
    accounts: &InitializeLbPairAccounts,
    active_id: i32,
    bin_step: u16,
) -> Instruction {
    let mut data = instruction_discriminator("initialize_lb_pair").to_vec();
    data.extend_from_slice(&active_id.to_le_bytes());
    data.extend_from_slice(&bin_step.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(accounts.lb_pair, false),
            // optional bitmap extension, omitted
            AccountMeta::new_readonly(*program_id, false),
            AccountMeta::new_readonly(accounts.token_mint_x, false),
            AccountMeta::new_readonly(accounts.token_mint_y, false),
            AccountMeta::new(accounts.reserve_x, false),
            AccountMeta::new(accounts.reserve_y, false),
            AccountMeta::new(accounts.oracle, false),
            AccountMeta::new_readonly(accounts.preset_parameter, false),
            AccountMeta::new(accounts.funder, true),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(sysvar::rent::id(), false),
        ],
        data,
    }
}

/// Accounts required to open a position and seed it in one transaction.
#[derive(Debug, Clone)]
pub struct AddLiquidityAccounts {
    pub position: Pubkey,
    pub lb_pair: Pubkey,
    pub user_token_x: Pubkey,
    pub user_token_y: Pubkey,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub token_mint_x: Pubkey,
    pub token_mint_y: Pubkey,
    pub owner: Pubkey,
    pub bin_arrays: Vec<Pubkey>,
}

/// Create a position covering `range` and deposit by strategy.
///
/// `position` must sign (it is a fresh account), as must `owner`.
pub fn initialize_position_and_add_liquidity(
    program_id: &Pubkey,
    accounts: &AddLiquidityAccounts,
    range: &BinRange,
    amount_x: u64,
    amount_y: u64,
    strategy: StrategyKind,
) -> Instruction {
    let mut data =
        instruction_discriminator("initialize_position_and_add_liquidity_by_strategy").to_vec();
    data.extend_from_slice(&range.min_bin_id.to_le_bytes());
    data.extend_from_slice(&range.max_bin_id.to_le_bytes());
    data.extend_from_slice(&amount_x.to_le_bytes());
    data.extend_from_slice(&amount_y.to_le_bytes());
    data.push(strategy_code(strategy));

    let mut metas = vec![
        AccountMeta::new(accounts.position, true),
        AccountMeta::new(accounts.lb_pair, false),
        AccountMeta::new(accounts.user_token_x, false),
        AccountMeta::new(accounts.user_token_y, false),
        AccountMeta::new(accounts.reserve_x, false),
        AccountMeta::new(accounts.reserve_y, false),
        AccountMeta::new_readonly(accounts.token_mint_x, false),
        AccountMeta::new_readonly(accounts.token_mint_y, false),
        AccountMeta::new(accounts.owner, true),
    ];
    metas.extend(
        accounts
            .bin_arrays
            .iter()
            .map(|array| AccountMeta::new(*array, false)),
    );
    metas.push(AccountMeta::new_readonly(spl_token::id(), false));
    metas.push(AccountMeta::new_readonly(system_program::id(), false));
    metas.push(AccountMeta::new_readonly(sysvar::rent::id(), false));

    Instruction {
        program_id: *program_id,
        accounts: metas,
        data,
    }
}

/// Accounts required to swap against a pool.
#[derive(Debug, Clone)]
pub struct SwapAccounts {
    pub lb_pair: Pubkey,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub user_token_in: Pubkey,
    pub user_token_out: Pubkey,
    pub token_mint_x: Pubkey,
    pub token_mint_y: Pubkey,
    pub oracle: Pubkey,
    pub user: Pubkey,
    pub bin_arrays: Vec<Pubkey>,
}

/// Swap `amount_in` with an on-chain-enforced output floor.
pub fn swap(
    program_id: &Pubkey,
    accounts: &SwapAccounts,
    amount_in: u64,
    min_amount_out: u64,
) -> Instruction {
    let mut data = instruction_discriminator("swap").to_vec();
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&min_amount_out.to_le_bytes());

    let mut metas = vec![
        AccountMeta::new(accounts.lb_pair, false),
        AccountMeta::new_readonly(*program_id, false),
        AccountMeta::new(accounts.reserve_x, false),
        AccountMeta::new(accounts.reserve_y, false),
        AccountMeta::new(accounts.user_token_in, false),
        AccountMeta::new(accounts.user_token_out, false),
        AccountMeta::new_readonly(accounts.token_mint_x, false),
        AccountMeta::new_readonly(accounts.token_mint_y, false),
        AccountMeta::new(accounts.oracle, false),
        AccountMeta::new(accounts.user, true),
    ];
    metas.extend(
        accounts
            .bin_arrays
            .iter()
            .map(|array| AccountMeta::new(*array, false)),
    );
    metas.push(AccountMeta::new_readonly(spl_token::id(), false));

    Instruction {
        program_id: *program_id,
        accounts: metas,
        data,
    }
}
