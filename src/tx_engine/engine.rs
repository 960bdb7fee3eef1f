//! Submission engine: build, sign, submit, confirm, retry.
//!
//! Each attempt walks Built -> Signed -> Submitted and ends in one of four
//! tagged outcomes. Only `Retryable` loops back to Built; the rebuild
//! fetches a fresh blockhash so a stale one is never resubmitted. `Expired`
//! and `Fatal` propagate immediately, and the attempt budget is bounded by
//! `max_retries`.
//!
//! Confirmation waits are bounded by block height, not wall-clock time: a
//! blockhash stops being creditable once the chain passes its validity
//! cutoff, and that cutoff is the only signal that polling can stop.
//!
//! Because a retry resubmits a rebuilt transaction, an earlier attempt may
//! still land afterwards. The ledger reports that as "already processed",
//! which is treated as success throughout.

use crate::tx_engine::errors::{RpcError, SubmitError};
use crate::tx_engine::rpc::{LedgerRpc, SignatureState};
use solana_sdk::commitment_config::CommitmentLevel;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::system_instruction;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Consecutive failed status polls tolerated before the attempt is
/// abandoned as retryable. Keeps a dead endpoint from pinning the
/// confirmation loop to the full validity window.
const MAX_POLL_FAILURES: u32 = 8;

/// Tunables for the submission pipeline.
#[derive(Debug, Clone)]
pub struct SubmitPolicy {
    /// Total attempts allowed per transaction, including the first.
    pub max_retries: u32,

    /// Lamports moved in a payer self-transfer appended to every
    /// transaction, raising its effective priority. Zero disables the bump.
    pub priority_fee_lamports: u64,

    /// Blocks subtracted from the reported validity height. Confirmation
    /// gives up this many blocks early rather than racing the network's
    /// own expiry.
    pub expiry_margin_blocks: u64,

    /// Delay between confirmation status polls.
    pub confirm_poll: Duration,

    /// Commitment a signature must reach to count as confirmed.
    pub commitment: CommitmentLevel,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            priority_fee_lamports: 0,
            expiry_margin_blocks: 150,
            confirm_poll: Duration::from_millis(400),
            commitment: CommitmentLevel::Finalized,
        }
    }
}

/// Terminal result of a submission.
#[derive(Debug)]
pub enum TxOutcome {
    Confirmed(Signature),
    /// The validity window closed before the signature reached the
    /// requested commitment. The transaction may or may not have landed.
    Expired { cutoff: u64 },
    Failed(SubmitError),
}

impl TxOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// Collapse into a `Result`, mapping `Expired` onto its error form.
    pub fn into_result(self) -> Result<Signature, SubmitError> {
        match self {
            Self::Confirmed(signature) => Ok(signature),
            Self::Expired { cutoff } => Err(SubmitError::BlockhashExpired { cutoff }),
            Self::Failed(err) => Err(err),
        }
    }
}

/// A transaction mid-pipeline: message, signatures, and the height cutoff
/// its blockhash is good for. Dropped once a terminal outcome exists.
struct PendingTransaction {
    tx: Transaction,
    blockhash: Hash,
    cutoff: u64,
}

/// Per-attempt result driving the retry loop.
enum AttemptOutcome {
    Confirmed(Signature),
    Retryable(RpcError),
    Fatal(SubmitError),
    Expired { cutoff: u64 },
}

/// Builds, signs, submits, and confirms transactions with bounded retry.
///
/// Holds no state beyond the policy and the RPC handle; independent
/// submissions may run concurrently against the same engine.
pub struct ReliabilityEngine<R: LedgerRpc> {
    rpc: Arc<R>,
    policy: SubmitPolicy,
}

impl<R: LedgerRpc> ReliabilityEngine<R> {
    pub fn new(rpc: Arc<R>, policy: SubmitPolicy) -> Self {
        Self { rpc, policy }
    }

    pub fn policy(&self) -> &SubmitPolicy {
        &self.policy
    }

    /// Submit `instructions` as one transaction and wait for it to reach
    /// the configured commitment.
    ///
    /// `signers` must include the payer and every other required signer;
    /// a missing signer fails fatally before anything reaches the network.
    pub async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> TxOutcome {
        let max_attempts = self.policy.max_retries.max(1);
        let mut last_transient: Option<RpcError> = None;

        for attempt in 1..=max_attempts {
            match self.attempt(instructions, payer, signers).await {
                AttemptOutcome::Confirmed(signature) => {
                    info!(%signature, attempt, "transaction confirmed");
                    return TxOutcome::Confirmed(signature);
                }
                AttemptOutcome::Expired { cutoff } => {
                    warn!(attempt, cutoff, "blockhash validity window closed");
                    return TxOutcome::Expired { cutoff };
                }
                AttemptOutcome::Fatal(err) => {
                    warn!(attempt, category = err.category(), error = %err, "fatal submission failure");
                    return TxOutcome::Failed(err);
                }
                AttemptOutcome::Retryable(err) => {
                    warn!(
                        attempt,
                        max_attempts,
                        error = %err,
                        "transient submission failure, rebuilding"
                    );
                    last_transient = Some(err);
                }
            }
        }

        let last = last_transient
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown transient failure".to_string());
        TxOutcome::Failed(SubmitError::RetriesExhausted {
            attempts: max_attempts,
            last,
        })
    }

    /// One full build -> sign -> submit -> confirm pass.
    async fn attempt(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> AttemptOutcome {
        let pending = match self.build(instructions, payer, signers).await {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };

        let expected = pending.tx.signatures[0];
        let signature = match self.rpc.submit_transaction(&pending.tx).await {
            Ok(signature) => signature,
            // A prior attempt already landed this payload.
            Err(RpcError::AlreadyProcessed) => expected,
            Err(err) if err.is_transient() => return AttemptOutcome::Retryable(err),
            Err(RpcError::Execution(reason)) => {
                return AttemptOutcome::Fatal(SubmitError::ExecutionReverted(reason))
            }
            Err(err) => return AttemptOutcome::Fatal(err.into()),
        };
        debug!(
            %signature,
            blockhash = %pending.blockhash,
            cutoff = pending.cutoff,
            "transaction submitted"
        );

        self.await_confirmation(signature, pending.cutoff).await
    }

    /// Assemble and sign a fresh transaction against the latest blockhash.
    async fn build(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        signers: &[&Keypair],
    ) -> Result<PendingTransaction, AttemptOutcome> {
        let (blockhash, last_valid_height) = match self.rpc.latest_blockhash().await {
            Ok(v) => v,
            Err(err) if err.is_transient() => return Err(AttemptOutcome::Retryable(err)),
            Err(err) => return Err(AttemptOutcome::Fatal(err.into())),
        };
        let cutoff = last_valid_height.saturating_sub(self.policy.expiry_margin_blocks);

        let mut instructions = instructions.to_vec();
        if self.policy.priority_fee_lamports > 0 {
            // Self-transfer fee bump. Appended before signing so the
            // signatures cover it.
            instructions.push(system_instruction::transfer(
                payer,
                payer,
                self.policy.priority_fee_lamports,
            ));
        }

        let message = Message::new_with_blockhash(&instructions, Some(payer), &blockhash);
        let mut tx = Transaction::new_unsigned(message);
        if let Err(err) = tx.try_sign(signers, blockhash) {
            return Err(AttemptOutcome::Fatal(SubmitError::SignatureMissing(
                err.to_string(),
            )));
        }

        Ok(PendingTransaction {
            tx,
            blockhash,
            cutoff,
        })
    }

    /// Poll until the signature reaches the configured commitment, its
    /// execution fails, or the chain passes the validity cutoff.
    async fn await_confirmation(&self, signature: Signature, cutoff: u64) -> AttemptOutcome {
        let mut poll_failures = 0u32;
        loop {
            match self.rpc.signature_status(&signature).await {
                Ok(SignatureState::Failed(reason)) => {
                    return AttemptOutcome::Fatal(SubmitError::ExecutionReverted(reason));
                }
                Ok(state) if state.satisfies(self.policy.commitment) => {
                    return AttemptOutcome::Confirmed(signature);
                }
                Ok(state) => {
                    poll_failures = 0;
                    debug!(%signature, ?state, "awaiting confirmation");
                }
                Err(err) => {
                    poll_failures += 1;
                    if poll_failures >= MAX_POLL_FAILURES {
                        return AttemptOutcome::Retryable(err);
                    }
                    debug!(%signature, poll_failures, error = %err, "status poll failed");
                }
            }

            match self.rpc.block_height().await {
                Ok(height) if height > cutoff => {
                    return AttemptOutcome::Expired { cutoff };
                }
                Ok(_) => {}
                Err(err) => {
                    poll_failures += 1;
                    if poll_failures >= MAX_POLL_FAILURES {
                        return AttemptOutcome::Retryable(err);
                    }
                }
            }

            tokio::time::sleep(self.policy.confirm_poll).await;
        }
    }
}
