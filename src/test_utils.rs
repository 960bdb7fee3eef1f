//! Deterministic in-memory ledger used by the test suite.
//!
//! `MockLedger` implements [`LedgerRpc`] entirely in memory: submit results
//! and signature states can be scripted ahead of time, accounts are a plain
//! map, and the block height advances by a configurable step on every
//! height query. Every submitted transaction is recorded, including ones
//! that were scripted to fail, so tests can assert on attempt counts and
//! transaction contents.

use crate::tx_engine::errors::RpcError;
use crate::tx_engine::rpc::{LedgerRpc, SignatureState};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::collections::{HashMap, VecDeque};

struct MockState {
    height: u64,
    height_step: u64,
    last_valid_offset: u64,
    rent_per_byte: u64,
    hold_confirmations: bool,
    accounts: HashMap<Pubkey, Account>,
    submit_plan: VecDeque<RpcError>,
    status_plan: VecDeque<SignatureState>,
    submissions: Vec<Transaction>,
}

pub struct MockLedger {
    state: Mutex<MockState>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                height: 1_000,
                height_step: 1,
                last_valid_offset: 300,
                rent_per_byte: 6_960,
                hold_confirmations: false,
                accounts: HashMap::new(),
                submit_plan: VecDeque::new(),
                status_plan: VecDeque::new(),
                submissions: Vec::new(),
            }),
        }
    }

    /// Insert an account so existence checks and reads find it.
    pub fn insert_account(&self, address: Pubkey, data: Vec<u8>, owner: Pubkey) {
        self.state.lock().accounts.insert(
            address,
            Account {
                lamports: 1_000_000,
                data,
                owner,
                executable: false,
                rent_epoch: 0,
            },
        );
    }

    /// Script the next submission to fail with `err`. Queued failures are
    /// consumed in order; once drained, submissions succeed.
    pub fn queue_submit_failure(&self, err: RpcError) {
        self.state.lock().submit_plan.push_back(err);
    }

    /// Script the next signature-status poll. Once drained, polls fall back
    /// to the default behavior.
    pub fn queue_status(&self, state: SignatureState) {
        self.state.lock().status_plan.push_back(state);
    }

    /// Keep reporting submitted signatures as unseen, so confirmation can
    /// only end through the height cutoff.
    pub fn hold_confirmations(&self) {
        self.state.lock().hold_confirmations = true;
    }

    /// Distance between the reported height and a blockhash's last valid
    /// height. Zero makes every fetched blockhash immediately past a
    /// nonzero expiry margin.
    pub fn set_last_valid_offset(&self, offset: u64) {
        self.state.lock().last_valid_offset = offset;
    }

    /// How far the height advances per height query.
    pub fn set_height_step(&self, step: u64) {
        self.state.lock().height_step = step;
    }

    pub fn submission_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    /// All transactions handed to `submit_transaction`, in call order.
    pub fn submissions(&self) -> Vec<Transaction> {
        self.state.lock().submissions.clone()
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn latest_blockhash(&self) -> Result<(Hash, u64), RpcError> {
        let state = self.state.lock();
        Ok((Hash::new_unique(), state.height + state.last_valid_offset))
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        let mut state = self.state.lock();
        state.height += state.height_step;
        Ok(state.height)
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, RpcError> {
        Ok(self.state.lock().accounts.get(address).cloned())
    }

    async fn submit_transaction(&self, tx: &Transaction) -> Result<Signature, RpcError> {
        let mut state = self.state.lock();
        state.submissions.push(tx.clone());
        if let Some(err) = state.submit_plan.pop_front() {
            return Err(err);
        }
        Ok(tx.signatures[0])
    }

    async fn signature_status(&self, signature: &Signature) -> Result<SignatureState, RpcError> {
        let mut state = self.state.lock();
        if let Some(scripted) = state.status_plan.pop_front() {
            return Ok(scripted);
        }
        if state.hold_confirmations {
            return Ok(SignatureState::Unknown);
        }
        let seen = state
            .submissions
            .iter()
            .any(|tx| tx.signatures.first() == Some(signature));
        Ok(if seen {
            SignatureState::Finalized
        } else {
            SignatureState::Unknown
        })
    }

    async fn minimum_rent_exempt_balance(&self, data_len: usize) -> Result<u64, RpcError> {
        let state = self.state.lock();
        Ok((data_len as u64 + 128) * state.rent_per_byte)
    }
}
