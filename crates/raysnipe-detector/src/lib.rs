//! Pool-creation detection for raysnipe.
//!
//! Watches the Raydium AMM program's log stream for pool-initialization
//! transactions and resolves the new pool's mints and vault accounts from
//! the confirmed transaction.

pub mod config;
pub mod error;
pub mod pool_keys;
pub mod signal;

pub use config::DetectorConfig;
pub use error::{DetectorError, DetectorResult};
pub use pool_keys::{extract_pool_keys, fetch_pool_keys, PoolKeys};
pub use signal::pool_creation_signature;
