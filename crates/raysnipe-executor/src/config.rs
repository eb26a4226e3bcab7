//! Executor configuration.

use serde::{Deserialize, Serialize};

/// Swap execution configuration.
///
/// The buy side is sized in lamports; the sell side always moves the whole
/// position. Priority fees and slippage are configured per side because
/// exits compete with everyone else fleeing the same pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_quote_url")]
    pub quote_url: String,
    #[serde(default = "default_swap_url")]
    pub swap_url: String,
    #[serde(default = "default_price_url")]
    pub price_url: String,
    /// Timeout for Jupiter HTTP requests (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Entry swap size in lamports.
    #[serde(default = "default_buy_amount_lamports")]
    pub buy_amount_lamports: u64,
    #[serde(default = "default_buy_slippage_bps")]
    pub buy_slippage_bps: u32,
    #[serde(default = "default_sell_slippage_bps")]
    pub sell_slippage_bps: u32,
    /// Cap for the dynamic slippage Jupiter may apply on top.
    #[serde(default = "default_dynamic_slippage_max_bps")]
    pub dynamic_slippage_max_bps: u32,
    #[serde(default = "default_buy_priority_fee_max_lamports")]
    pub buy_priority_fee_max_lamports: u64,
    #[serde(default = "default_sell_priority_fee_max_lamports")]
    pub sell_priority_fee_max_lamports: u64,
    /// Jupiter priority-fee level (min/low/medium/high/veryHigh).
    #[serde(default = "default_priority_level")]
    pub priority_level: String,
    /// Confirmation polling attempts after a send.
    #[serde(default = "default_confirm_max_attempts")]
    pub confirm_max_attempts: u32,
    /// Delay between confirmation polls (ms).
    #[serde(default = "default_confirm_delay_ms")]
    pub confirm_delay_ms: u64,
    /// How often to retry a quote while Jupiter still reports the token as
    /// not tradable.
    #[serde(default = "default_not_tradable_retries")]
    pub not_tradable_retries: u32,
    /// Delay between those retries (ms).
    #[serde(default = "default_not_tradable_delay_ms")]
    pub not_tradable_delay_ms: u64,
}

fn default_quote_url() -> String {
    "https://quote-api.jup.ag/v6/quote".to_string()
}

fn default_swap_url() -> String {
    "https://quote-api.jup.ag/v6/swap".to_string()
}

fn default_price_url() -> String {
    "https://api.jup.ag/price/v2".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_buy_amount_lamports() -> u64 {
    // 0.01 SOL.
    10_000_000
}

fn default_buy_slippage_bps() -> u32 {
    300
}

fn default_sell_slippage_bps() -> u32 {
    500
}

fn default_dynamic_slippage_max_bps() -> u32 {
    300
}

fn default_buy_priority_fee_max_lamports() -> u64 {
    1_500_000
}

fn default_sell_priority_fee_max_lamports() -> u64 {
    1_000_000
}

fn default_priority_level() -> String {
    "veryHigh".to_string()
}

fn default_confirm_max_attempts() -> u32 {
    3
}

fn default_confirm_delay_ms() -> u64 {
    2_000
}

fn default_not_tradable_retries() -> u32 {
    5
}

fn default_not_tradable_delay_ms() -> u64 {
    1_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            quote_url: default_quote_url(),
            swap_url: default_swap_url(),
            price_url: default_price_url(),
            request_timeout_ms: default_request_timeout_ms(),
            buy_amount_lamports: default_buy_amount_lamports(),
            buy_slippage_bps: default_buy_slippage_bps(),
            sell_slippage_bps: default_sell_slippage_bps(),
            dynamic_slippage_max_bps: default_dynamic_slippage_max_bps(),
            buy_priority_fee_max_lamports: default_buy_priority_fee_max_lamports(),
            sell_priority_fee_max_lamports: default_sell_priority_fee_max_lamports(),
            priority_level: default_priority_level(),
            confirm_max_attempts: default_confirm_max_attempts(),
            confirm_delay_ms: default_confirm_delay_ms(),
            not_tradable_retries: default_not_tradable_retries(),
            not_tradable_delay_ms: default_not_tradable_delay_ms(),
        }
    }
}
