//! Idempotent token provisioning: mints, token accounts, initial supply.
//!
//! Everything here is setup for the pool bootstrap. Each helper checks
//! remote state before submitting, so re-running a partially completed
//! launch does not fail on resources that already exist.

use crate::tx_engine::errors::{RpcError, SubmitError};
use crate::tx_engine::rpc::LedgerRpc;
use crate::tx_engine::ReliabilityEngine;
use crate::wallet::{ephemeral_identity, WalletManager};
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use solana_sdk::system_instruction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("instruction build failed: {0}")]
    Instruction(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Provisions mints and token accounts through the reliability engine.
pub struct TokenProvisioner<'a, R: LedgerRpc> {
    rpc: &'a R,
    engine: &'a ReliabilityEngine<R>,
}

impl<'a, R: LedgerRpc> TokenProvisioner<'a, R> {
    pub fn new(rpc: &'a R, engine: &'a ReliabilityEngine<R>) -> Self {
        Self { rpc, engine }
    }

    /// Create a fresh mint with `payer` as its authority.
    pub async fn create_mint(
        &self,
        payer: &WalletManager,
        decimals: u8,
    ) -> Result<Pubkey, SetupError> {
        let mint = ephemeral_identity();
        let space = spl_token::state::Mint::LEN;
        let rent = self.rpc.minimum_rent_exempt_balance(space).await?;

        let instructions = [
            system_instruction::create_account(
                &payer.pubkey(),
                &mint.pubkey(),
                rent,
                space as u64,
                &spl_token::id(),
            ),
            spl_token::instruction::initialize_mint2(
                &spl_token::id(),
                &mint.pubkey(),
                &payer.pubkey(),
                None,
                decimals,
            )
            .map_err(|e| SetupError::Instruction(e.to_string()))?,
        ];

        self.engine
            .send_and_confirm(&instructions, &payer.pubkey(), &[payer.keypair(), &mint])
            .await
            .into_result()?;
        info!(mint = %mint.pubkey(), decimals, "mint created");
        Ok(mint.pubkey())
    }

    /// Associated token account for `owner` and `mint`, creating it only if
    /// it does not exist yet.
    pub async fn ensure_token_account(
        &self,
        payer: &WalletManager,
        owner: &Pubkey,
        mint: &Pubkey,
    ) -> Result<Pubkey, SetupError> {
        let address = get_associated_token_address(owner, mint);
        if self.rpc.get_account(&address).await?.is_some() {
            debug!(%address, %mint, "token account already exists");
            return Ok(address);
        }

        let instruction = create_associated_token_account_idempotent(
            &payer.pubkey(),
            owner,
            mint,
            &spl_token::id(),
        );
        self.engine
            .send_and_confirm(&[instruction], &payer.pubkey(), &[payer.keypair()])
            .await
            .into_result()?;
        info!(%address, %mint, "token account created");
        Ok(address)
    }

    /// Mint `amount` base units to `destination`. The payer must be the
    /// mint authority.
    pub async fn mint_supply(
        &self,
        payer: &WalletManager,
        mint: &Pubkey,
        destination: &Pubkey,
        amount: u64,
    ) -> Result<(), SetupError> {
        let instruction = spl_token::instruction::mint_to(
            &spl_token::id(),
            mint,
            destination,
            &payer.pubkey(),
            &[],
            amount,
        )
        .map_err(|e| SetupError::Instruction(e.to_string()))?;

        self.engine
            .send_and_confirm(&[instruction], &payer.pubkey(), &[payer.keypair()])
            .await
            .into_result()?;
        info!(%mint, %destination, amount, "supply minted");
        Ok(())
    }
}
