//! Read-side handle to a deployed pool.
//!
//! Pool accounts are decoded from a fixed little-endian layout behind the
//! usual eight-byte account tag. Only the fields this client acts on are
//! decoded; the on-chain account carries more.

use crate::dlmm::instructions::account_discriminator;
use crate::planner::price_of_bin;
use crate::tx_engine::errors::RpcError;
use crate::tx_engine::rpc::LedgerRpc;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("no pool account at {0}")]
    AccountMissing(Pubkey),

    #[error("account data is not a pool (bad discriminator)")]
    BadDiscriminator,

    #[error("pool account truncated: {len} bytes")]
    Truncated { len: usize },

    #[error("rpc failure: {0}")]
    Rpc(#[from] RpcError),
}

/// Decoded pool account state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LbPairState {
    pub bin_step: u16,
    pub base_factor: u16,
    pub active_id: i32,
    pub token_x_mint: Pubkey,
    pub token_y_mint: Pubkey,
    pub reserve_x: Pubkey,
    pub reserve_y: Pubkey,
    pub status: u8,
}

impl LbPairState {
    pub const LEN: usize = 8 + 2 + 2 + 4 + 32 * 4 + 1;

    pub fn from_bytes(data: &[u8]) -> Result<Self, PoolError> {
        if data.len() < Self::LEN {
            return Err(PoolError::Truncated { len: data.len() });
        }
        if data[..8] != account_discriminator("LbPair") {
            return Err(PoolError::BadDiscriminator);
        }
        Ok(Self {
            bin_step: u16::from_le_bytes([data[8], data[9]]),
            base_factor: u16::from_le_bytes([data[10], data[11]]),
            active_id: i32::from_le_bytes([data[12], data[13], data[14], data[15]]),
            token_x_mint: pubkey_at(data, 16),
            token_y_mint: pubkey_at(data, 48),
            reserve_x: pubkey_at(data, 80),
            reserve_y: pubkey_at(data, 112),
            status: data[144],
        })
    }

    /// Serialized account image. The mock ledger uses this to fabricate
    /// pool accounts in tests.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = account_discriminator("LbPair").to_vec();
        data.extend_from_slice(&self.bin_step.to_le_bytes());
        data.extend_from_slice(&self.base_factor.to_le_bytes());
        data.extend_from_slice(&self.active_id.to_le_bytes());
        data.extend_from_slice(self.token_x_mint.as_ref());
        data.extend_from_slice(self.token_y_mint.as_ref());
        data.extend_from_slice(self.reserve_x.as_ref());
        data.extend_from_slice(self.reserve_y.as_ref());
        data.push(self.status);
        data
    }
}

fn pubkey_at(data: &[u8], offset: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(bytes)
}

/// A located, decoded pool.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    pub address: Pubkey,
    pub state: LbPairState,
}

impl PoolHandle {
    /// Fetch and decode the pool account at `address`.
    pub async fn load<R: LedgerRpc + ?Sized>(rpc: &R, address: Pubkey) -> Result<Self, PoolError> {
        let account = rpc
            .get_account(&address)
            .await?
            .ok_or(PoolError::AccountMissing(address))?;
        let state = LbPairState::from_bytes(&account.data)?;
        Ok(Self { address, state })
    }

    pub fn active_bin_id(&self) -> i32 {
        self.state.active_id
    }

    /// Spot price at the active bin, in Y per X.
    pub fn active_price(&self) -> f64 {
        price_of_bin(self.state.active_id, self.state.bin_step)
    }

    /// Base fee taken on every swap, as a fraction of the input.
    pub fn base_fee_rate(&self) -> f64 {
        f64::from(self.state.bin_step) * f64::from(self.state.base_factor) / 1e8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> LbPairState {
        LbPairState {
            bin_step: 100,
            base_factor: 1_000,
            active_id: 70,
            token_x_mint: Pubkey::new_unique(),
            token_y_mint: Pubkey::new_unique(),
            reserve_x: Pubkey::new_unique(),
            reserve_y: Pubkey::new_unique(),
            status: 0,
        }
    }

    #[test]
    fn state_round_trips_through_bytes() {
        let state = sample_state();
        let decoded = LbPairState::from_bytes(&state.to_bytes()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn decode_rejects_foreign_accounts() {
        let mut data = sample_state().to_bytes();
        data[0] ^= 0xff;
        assert!(matches!(
            LbPairState::from_bytes(&data),
            Err(PoolError::BadDiscriminator)
        ));
        assert!(matches!(
            LbPairState::from_bytes(&data[..40]),
            Err(PoolError::Truncated { len: 40 })
        ));
    }

    #[test]
    fn active_price_tracks_bin_id() {
        let mut state = sample_state();
        state.active_id = 0;
        let handle = PoolHandle {
            address: Pubkey::new_unique(),
            state,
        };
        assert!((handle.active_price() - 1.0).abs() < 1e-12);

        let mut above = handle.clone();
        above.state.active_id = 70;
        // (1.01)^70 is a little above 2
        assert!(above.active_price() > 2.0);
        assert!(above.active_price() < 2.01);
    }

    #[test]
    fn base_fee_rate_matches_tier() {
        let handle = PoolHandle {
            address: Pubkey::new_unique(),
            state: sample_state(),
        };
        // 100 * 1000 / 1e8 = 10 bps
        assert!((handle.base_fee_rate() - 0.001).abs() < 1e-12);
    }
}
