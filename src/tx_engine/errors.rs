//! Error taxonomy for transaction submission.
//!
//! `RpcError` classifies transport-level failures at the RPC seam; the
//! engine recovers the transient ones by rebuilding and resubmitting.
//! `SubmitError` is the terminal surface: every variant ends the attempt
//! loop and propagates to the caller unchanged.

use thiserror::Error;

/// Classified failure from a single RPC request.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Connection-level failure: reset, timeout, gateway error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The node answered but cannot serve traffic right now.
    #[error("node unavailable: {0}")]
    NodeBusy(String),

    /// The ledger has already seen this exact transaction. A prior
    /// submission landed; callers treat this as success, not failure.
    #[error("transaction already processed")]
    AlreadyProcessed,

    /// The transaction was rejected by program logic, at preflight or
    /// on chain.
    #[error("execution failed: {0}")]
    Execution(String),

    /// The request itself was invalid. Never retried.
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl RpcError {
    /// Whether resubmitting (with a fresh blockhash) might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::NodeBusy(_))
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::NodeBusy(_) => "node-busy",
            Self::AlreadyProcessed => "already-processed",
            Self::Execution(_) => "execution",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Terminal outcome of a submission, after any internal retries.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// The blockhash validity window closed before the signature reached
    /// the requested commitment.
    #[error("blockhash expired before confirmation (cutoff height {cutoff})")]
    BlockhashExpired { cutoff: u64 },

    /// A required signer was not supplied. Configuration bug; retrying
    /// cannot help.
    #[error("missing required signer: {0}")]
    SignatureMissing(String),

    /// The ledger rejected the transaction's logic.
    #[error("transaction reverted: {0}")]
    ExecutionReverted(String),

    /// Every allowed attempt failed on a transient error. Carries the
    /// last underlying cause.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// An RPC failure outside the retryable set.
    #[error("rpc failure: {0}")]
    Rpc(#[from] RpcError),
}

impl SubmitError {
    pub fn category(&self) -> &'static str {
        match self {
            Self::BlockhashExpired { .. } => "expired",
            Self::SignatureMissing(_) => "signing",
            Self::ExecutionReverted(_) => "reverted",
            Self::RetriesExhausted { .. } => "retries-exhausted",
            Self::Rpc(_) => "rpc",
        }
    }
}
