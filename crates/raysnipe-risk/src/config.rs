//! Risk gate configuration.

use serde::{Deserialize, Serialize};

/// Rug-check gate configuration.
///
/// `allow_*` switches tolerate a specific finding; thresholds bound the
/// holder/liquidity shape; `legacy_not_allowed` names report risks that are
/// rejected outright when listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RugCheckConfig {
    /// Base URL of the token report endpoint.
    #[serde(default = "default_report_url")]
    pub report_url: String,
    /// Report request timeout (ms).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    // Dangerous findings.
    #[serde(default)]
    pub allow_mint_authority: bool,
    #[serde(default)]
    pub allow_not_initialized: bool,
    #[serde(default)]
    pub allow_freeze_authority: bool,
    #[serde(default)]
    pub allow_rugged: bool,
    #[serde(default)]
    pub allow_graph_insiders: bool,

    // Critical findings.
    #[serde(default)]
    pub allow_mutable: bool,
    #[serde(default = "default_true")]
    pub allow_insider_topholders: bool,
    #[serde(default = "default_max_allowed_pct_topholders")]
    pub max_allowed_pct_topholders: f64,
    #[serde(default = "default_true")]
    pub exclude_lp_from_topholders: bool,
    #[serde(default)]
    pub block_returning_token_names: bool,
    #[serde(default)]
    pub block_returning_token_creators: bool,
    #[serde(default = "default_block_list")]
    pub block_symbols: Vec<String>,
    #[serde(default = "default_block_list")]
    pub block_names: Vec<String>,

    // Warning thresholds.
    #[serde(default = "default_one")]
    pub min_total_markets: i64,
    #[serde(default = "default_one")]
    pub min_total_lp_providers: i64,
    #[serde(default = "default_min_total_market_liquidity")]
    pub min_total_market_liquidity: f64,
    /// Reject when the report score exceeds this value; 0 disables the check.
    #[serde(default)]
    pub max_score: i64,

    /// Skip pump.fun-suffixed mints entirely.
    #[serde(default)]
    pub ignore_pump_fun: bool,

    /// Report risk names rejected outright.
    #[serde(default = "default_legacy_not_allowed")]
    pub legacy_not_allowed: Vec<String>,
}

fn default_report_url() -> String {
    "https://api.rugcheck.xyz/v1/tokens".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_max_allowed_pct_topholders() -> f64 {
    15.0
}

fn default_block_list() -> Vec<String> {
    Vec::new()
}

fn default_one() -> i64 {
    1
}

fn default_min_total_market_liquidity() -> f64 {
    1_000.0
}

fn default_legacy_not_allowed() -> Vec<String> {
    vec![
        "Low Liquidity".to_string(),
        "Single holder ownership".to_string(),
        "High holder concentration".to_string(),
        "Freeze Authority still enabled".to_string(),
    ]
}

impl Default for RugCheckConfig {
    fn default() -> Self {
        Self {
            report_url: default_report_url(),
            timeout_ms: default_timeout_ms(),
            allow_mint_authority: false,
            allow_not_initialized: false,
            allow_freeze_authority: false,
            allow_rugged: false,
            allow_graph_insiders: false,
            allow_mutable: false,
            allow_insider_topholders: true,
            max_allowed_pct_topholders: default_max_allowed_pct_topholders(),
            exclude_lp_from_topholders: true,
            block_returning_token_names: false,
            block_returning_token_creators: false,
            block_symbols: Vec::new(),
            block_names: Vec::new(),
            min_total_markets: 1,
            min_total_lp_providers: 1,
            min_total_market_liquidity: default_min_total_market_liquidity(),
            max_score: 0,
            ignore_pump_fun: false,
            legacy_not_allowed: default_legacy_not_allowed(),
        }
    }
}

impl RugCheckConfig {
    pub fn legacy_blocks(&self, risk_name: &str) -> bool {
        self.legacy_not_allowed.iter().any(|n| n == risk_name)
    }
}
