//! Client-side interface to the bin-liquidity (DLMM) program: address
//! derivation, instruction building, and pool account decoding.

pub mod constants;
pub mod derive;
pub mod instructions;
pub mod pool;

pub use constants::{lb_clmm_program_id, Cluster};
pub use derive::DeriveError;
pub use instructions::PresetParameters;
pub use pool::{LbPairState, PoolError, PoolHandle};
