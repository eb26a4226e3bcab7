//! Detector configuration.

use raysnipe_core::Address;
use serde::{Deserialize, Serialize};

/// Detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// AMM program whose logs announce pool initialization.
    #[serde(default = "default_amm_program_id")]
    pub amm_program_id: Address,
    /// Wrapped-SOL mint, used to orient the pool's base/quote sides.
    #[serde(default = "default_wsol_mint")]
    pub wsol_mint: Address,
    /// How many times to retry fetching the pool-creation transaction.
    #[serde(default = "default_fetch_tx_max_retries")]
    pub fetch_tx_max_retries: u32,
    /// Delay before the first fetch attempt, giving the transaction time to
    /// reach confirmed commitment (ms).
    #[serde(default = "default_fetch_tx_initial_delay_ms")]
    pub fetch_tx_initial_delay_ms: u64,
}

fn default_amm_program_id() -> Address {
    // Raydium Liquidity Pool V4.
    Address::new("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8")
}

fn default_wsol_mint() -> Address {
    Address::new("So11111111111111111111111111111111111111112")
}

fn default_fetch_tx_max_retries() -> u32 {
    10
}

fn default_fetch_tx_initial_delay_ms() -> u64 {
    3_000
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            amm_program_id: default_amm_program_id(),
            wsol_mint: default_wsol_mint(),
            fetch_tx_max_retries: default_fetch_tx_max_retries(),
            fetch_tx_initial_delay_ms: default_fetch_tx_initial_delay_ms(),
        }
    }
}
