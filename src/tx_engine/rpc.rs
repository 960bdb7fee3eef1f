//! RPC channel abstraction and the live Solana implementation.
//!
//! The engine and workflows talk to the ledger through [`LedgerRpc`], which
//! mirrors the handful of JSON-RPC calls this client needs. The live
//! implementation wraps the nonblocking `RpcClient` and classifies its
//! errors into the [`RpcError`] taxonomy; tests substitute the in-memory
//! ledger from `test_utils`.

use crate::tx_engine::errors::RpcError;
use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_rpc_client_api::config::RpcSendTransactionConfig;
use solana_rpc_client_api::request::{RpcError as JsonRpcError, RpcResponseErrorData};
use solana_sdk::account::Account;
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, TransactionError};
use solana_transaction_status::TransactionConfirmationStatus;
use std::time::Duration;

/// Durability a submitted signature has reached so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    /// The node has not seen the signature yet.
    Unknown,
    Processed,
    Confirmed,
    Finalized,
    /// The transaction landed but its execution failed.
    Failed(String),
}

impl SignatureState {
    /// Whether this state is at least as durable as `level`.
    pub fn satisfies(&self, level: CommitmentLevel) -> bool {
        let rank = match self {
            Self::Processed => 0,
            Self::Confirmed => 1,
            Self::Finalized => 2,
            Self::Unknown | Self::Failed(_) => return false,
        };
        rank >= commitment_rank(level)
    }
}

fn commitment_rank(level: CommitmentLevel) -> u8 {
    match level {
        CommitmentLevel::Processed => 0,
        CommitmentLevel::Confirmed => 1,
        _ => 2,
    }
}

/// The RPC surface the client depends on.
#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Latest blockhash plus the last block height at which it is valid.
    async fn latest_blockhash(&self) -> Result<(Hash, u64), RpcError>;

    /// Current network block height.
    async fn block_height(&self) -> Result<u64, RpcError>;

    /// Account at `address`, or `None` if it does not exist.
    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RpcError>;

    /// Submit a fully signed transaction. Returns its signature.
    async fn submit_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError>;

    /// Confirmation state of a previously submitted signature.
    async fn signature_status(&self, signature: &Signature) -> Result<SignatureState, RpcError>;

    /// Minimum lamport balance making an account of `data_len` bytes
    /// rent-exempt.
    async fn minimum_rent_exempt_balance(&self, data_len: usize) -> Result<u64, RpcError>;
}

/// Live JSON-RPC channel.
pub struct SolanaRpc {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaRpc {
    pub fn new(url: impl Into<String>, timeout: Duration, commitment: CommitmentLevel) -> Self {
        let commitment = CommitmentConfig { commitment };
        Self {
            client: RpcClient::new_with_timeout_and_commitment(url.into(), timeout, commitment),
            commitment,
        }
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), RpcError> {
        self.client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(classify_client_error)
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        self.client
            .get_block_height_with_commitment(self.commitment)
            .await
            .map_err(classify_client_error)
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RpcError> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(classify_client_error)?;
        Ok(response.value)
    }

    async fn submit_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError> {
        // The node must not rebroadcast on its own; retries are owned here,
        // with a fresh blockhash per attempt.
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            max_retries: Some(0),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(classify_client_error)
    }

    async fn signature_status(&self, signature: &Signature) -> Result<SignatureState, RpcError> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(classify_client_error)?;
        let status = match response.value.into_iter().next().flatten() {
            Some(status) => status,
            None => return Ok(SignatureState::Unknown),
        };
        if let Some(err) = status.err {
            return Ok(SignatureState::Failed(err.to_string()));
        }
        Ok(match status.confirmation_status {
            Some(TransactionConfirmationStatus::Finalized) => SignatureState::Finalized,
            Some(TransactionConfirmationStatus::Confirmed) => SignatureState::Confirmed,
            Some(TransactionConfirmationStatus::Processed) | None => SignatureState::Processed,
        })
    }

    async fn minimum_rent_exempt_balance(&self, data_len: usize) -> Result<u64, RpcError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(classify_client_error)
    }
}

/// Map a client error onto the local taxonomy.
fn classify_client_error(err: ClientError) -> RpcError {
    match err.kind {
        ClientErrorKind::Io(e) => RpcError::Transport(e.to_string()),
        ClientErrorKind::Reqwest(e) => RpcError::Transport(e.to_string()),
        ClientErrorKind::TransactionError(TransactionError::AlreadyProcessed) => {
            RpcError::AlreadyProcessed
        }
        ClientErrorKind::TransactionError(e) => RpcError::Execution(e.to_string()),
        ClientErrorKind::SerdeJson(e) => RpcError::Malformed(e.to_string()),
        ClientErrorKind::RpcError(rpc) => classify_json_rpc_error(rpc),
        other => classify_message(&other.to_string()),
    }
}

fn classify_json_rpc_error(err: JsonRpcError) -> RpcError {
    match err {
        JsonRpcError::RpcResponseError {
            data: RpcResponseErrorData::SendTransactionPreflightFailure(result),
            message,
            ..
        } => match result.err {
            Some(TransactionError::AlreadyProcessed) => RpcError::AlreadyProcessed,
            // A stale blockhash at preflight means the next attempt needs a
            // fresh one, so it is transient from the engine's point of view.
            Some(TransactionError::BlockhashNotFound) => RpcError::Transport(message),
            Some(e) => RpcError::Execution(e.to_string()),
            None => classify_message(&message),
        },
        JsonRpcError::RpcResponseError {
            data: RpcResponseErrorData::NodeUnhealthy { num_slots_behind },
            message,
            ..
        } => RpcError::NodeBusy(match num_slots_behind {
            Some(behind) => format!("{message} ({behind} slots behind)"),
            None => message,
        }),
        JsonRpcError::RpcResponseError { message, .. } => classify_message(&message),
        other => classify_message(&other.to_string()),
    }
}

/// Heuristic classification for errors that only carry a message.
pub fn classify_message(message: &str) -> RpcError {
    let lower = message.to_lowercase();
    let transport_patterns = [
        "timeout",
        "timed out",
        "connection",
        "network",
        "temporarily unavailable",
        "too many requests",
        "rate limit",
        "502",
        "503",
        "504",
        "blockhash not found",
    ];
    let busy_patterns = ["node is behind", "unhealthy", "node is unhealthy"];

    if lower.contains("already processed") || lower.contains("already been processed") {
        RpcError::AlreadyProcessed
    } else if busy_patterns.iter().any(|p| lower.contains(p)) {
        RpcError::NodeBusy(message.to_string())
    } else if lower.contains("custom program error") || lower.contains("instruction error") {
        RpcError::Execution(message.to_string())
    } else if lower.contains("invalid param") || lower.contains("parse error") {
        RpcError::Malformed(message.to_string())
    } else if transport_patterns.iter().any(|p| lower.contains(p)) {
        RpcError::Transport(message.to_string())
    } else {
        // Unrecognized failures get a bounded retry rather than an abort.
        RpcError::Transport(message.to_string())
    }
}
