//! Swap orchestration against an existing pool.
//!
//! Quoting is read-only and local to the pool handle: active-bin price,
//! base fee, and a slippage floor. Execution submits exactly one
//! transaction with `min_out_amount` enforced on chain; a slippage revert
//! comes back as a fatal outcome and is never re-quoted here, since the
//! same retry would execute against a moved price.

use crate::dlmm::derive;
use crate::dlmm::instructions::{self, SwapAccounts};
use crate::dlmm::pool::PoolHandle;
use crate::tx_engine::rpc::LedgerRpc;
use crate::tx_engine::{ReliabilityEngine, SubmitPolicy, TxOutcome};
use crate::wallet::WalletManager;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, PartialEq)]
pub enum SwapError {
    #[error("swap amount must be nonzero")]
    ZeroAmount,

    #[error("slippage {0} bps exceeds 10000")]
    InvalidSlippage(u16),

    #[error("quoted output rounds to zero")]
    OutputTooSmall,
}

/// A priced swap with its on-chain-enforced output floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuote {
    pub amount_in: u64,
    pub expected_out: u64,
    pub min_out_amount: u64,
    /// Selling X for Y when true.
    pub swap_for_y: bool,
    /// Bin arrays the swap may cross, around the active bin.
    pub bin_arrays: Vec<Pubkey>,
}

/// Builds quotes and executes swaps through the reliability engine.
pub struct SwapOrchestrator<R: LedgerRpc> {
    engine: ReliabilityEngine<R>,
    program_id: Pubkey,
}

impl<R: LedgerRpc> SwapOrchestrator<R> {
    pub fn new(rpc: Arc<R>, policy: SubmitPolicy, program_id: Pubkey) -> Self {
        Self {
            engine: ReliabilityEngine::new(rpc, policy),
            program_id,
        }
    }

    /// Price `amount_in` against the pool's active bin.
    ///
    /// Read-only; nothing is submitted. The floor is `expected_out` reduced
    /// by `slippage_bps`.
    pub fn quote(
        &self,
        pool: &PoolHandle,
        amount_in: u64,
        swap_for_y: bool,
        slippage_bps: u16,
    ) -> Result<SwapQuote, SwapError> {
        if amount_in == 0 {
            return Err(SwapError::ZeroAmount);
        }
        if slippage_bps > 10_000 {
            return Err(SwapError::InvalidSlippage(slippage_bps));
        }

        let price = pool.active_price();
        let after_fee = amount_in as f64 * (1.0 - pool.base_fee_rate());
        let raw_out = if swap_for_y {
            after_fee * price
        } else {
            after_fee / price
        };
        let expected_out = raw_out.floor() as u64;
        if expected_out == 0 {
            return Err(SwapError::OutputTooSmall);
        }
        let min_out_amount =
            (raw_out * (1.0 - f64::from(slippage_bps) / 10_000.0)).floor() as u64;

        // one array on each side of the active one covers the crossable range
        let active = pool.active_bin_id();
        let first = derive::bin_array_index(active) - 1;
        let last = derive::bin_array_index(active) + 1;
        let bin_arrays = (first..=last)
            .map(|index| derive::derive_bin_array(&pool.address, index, &self.program_id))
            .collect();

        Ok(SwapQuote {
            amount_in,
            expected_out,
            min_out_amount,
            swap_for_y,
            bin_arrays,
        })
    }

    /// Submit a swap honoring the quote's output floor.
    ///
    /// Transient transport failures retry inside the engine; an on-chain
    /// rejection (including a violated floor) is terminal.
    pub async fn execute(
        &self,
        pool: &PoolHandle,
        quote: &SwapQuote,
        signer: &WalletManager,
    ) -> TxOutcome {
        let (mint_in, mint_out) = if quote.swap_for_y {
            (pool.state.token_x_mint, pool.state.token_y_mint)
        } else {
            (pool.state.token_y_mint, pool.state.token_x_mint)
        };
        let accounts = SwapAccounts {
            lb_pair: pool.address,
            reserve_x: pool.state.reserve_x,
            reserve_y: pool.state.reserve_y,
            user_token_in: get_associated_token_address(&signer.pubkey(), &mint_in),
            user_token_out: get_associated_token_address(&signer.pubkey(), &mint_out),
            token_mint_x: pool.state.token_x_mint,
            token_mint_y: pool.state.token_y_mint,
            oracle: derive::derive_oracle(&pool.address, &self.program_id),
            user: signer.pubkey(),
            bin_arrays: quote.bin_arrays.clone(),
        };
        let instruction = instructions::swap(
            &self.program_id,
            &accounts,
            quote.amount_in,
            quote.min_out_amount,
        );
        info!(
            pool = %pool.address,
            amount_in = quote.amount_in,
            min_out = quote.min_out_amount,
            swap_for_y = quote.swap_for_y,
            "submitting swap"
        );
        self.engine
            .send_and_confirm(&[instruction], &signer.pubkey(), &[signer.keypair()])
            .await
    }

}
