//! Rug-check gate.
//!
//! One report fetch per candidate token, reduced to a pass/fail verdict.
//! All tripped conditions are collected and logged, not just the first, so
//! the operator can see the full shape of a rejection.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use raysnipe_core::Address;

use crate::config::RugCheckConfig;
use crate::error::{RiskError, RiskResult};
use crate::ledger::TokenLedger;
use crate::report::RugReport;

/// Outcome of the risk gate for one token.
#[derive(Debug, Clone)]
pub struct GateVerdict {
    pub passed: bool,
    pub failures: Vec<String>,
}

impl GateVerdict {
    fn from_failures(failures: Vec<String>) -> Self {
        Self {
            passed: failures.is_empty(),
            failures,
        }
    }
}

/// Risk gate backed by the rugcheck.xyz token report.
pub struct RugCheckGate {
    client: Client,
    config: RugCheckConfig,
    ledger: TokenLedger,
}

impl RugCheckGate {
    pub fn new(config: RugCheckConfig) -> RiskResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RiskError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            ledger: TokenLedger::new(),
        })
    }

    /// Fetch the token report and evaluate it. A single call; the remote
    /// service does its own retries.
    pub async fn check(&self, mint: &Address) -> RiskResult<GateVerdict> {
        let url = format!("{}/{}/report", self.config.report_url, mint);
        debug!(mint = %mint, "Fetching rug-check report");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RiskError::Http(format!("report request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RiskError::Http(format!("report HTTP {status}")));
        }

        let report: RugReport = response
            .json()
            .await
            .map_err(|e| RiskError::Malformed(e.to_string()))?;

        let verdict = self.evaluate(&report, mint);
        if verdict.passed {
            info!(mint = %mint, score = report.score, "Rug check passed");
        } else {
            for failure in &verdict.failures {
                warn!(mint = %mint, failure = %failure, "Rug check condition tripped");
            }
        }

        Ok(verdict)
    }

    /// Evaluate a report against the configured conditions.
    pub fn evaluate(&self, report: &RugReport, mint: &Address) -> GateVerdict {
        let cfg = &self.config;
        let mut failures = Vec::new();

        let token_name = report.token_meta.name.as_str();
        let token_creator = report
            .creator
            .as_deref()
            .unwrap_or_else(|| mint.as_str());

        // Duplicate-token checks come first, then the token is recorded
        // either way so later candidates see it.
        if cfg.block_returning_token_names && self.ledger.name_seen(token_name, mint.as_str()) {
            failures.push(format!("Token name already seen: {token_name}"));
        }
        if cfg.block_returning_token_creators
            && self.ledger.creator_seen(token_creator, mint.as_str())
        {
            failures.push(format!("Token creator already seen: {token_creator}"));
        }
        self.ledger.register(mint.as_str(), token_name, token_creator);

        // Liquidity pools are not "holders" for concentration purposes.
        let lp_addresses = report.liquidity_addresses();
        let holders: Vec<_> = if cfg.exclude_lp_from_topholders {
            report
                .top_holders
                .iter()
                .filter(|h| !lp_addresses.contains(&h.address.as_str()))
                .collect()
        } else {
            report.top_holders.iter().collect()
        };
        let top_pct = holders.iter().map(|h| h.pct).fold(0.0_f64, f64::max);

        let (insider_pct, insider_wallets) = report
            .insider_networks
            .as_ref()
            .and_then(|n| n.first())
            .map(|n| {
                let pct = if report.token.supply > 0.0 {
                    (n.token_amount / report.token.supply * 100.0).ceil()
                } else {
                    0.0
                };
                (pct, n.size)
            })
            .unwrap_or((0.0, 0));

        if !cfg.allow_graph_insiders && insider_pct > 50.0 {
            failures.push(format!(
                "Graph insiders detected: {insider_pct}% sent to {insider_wallets} wallets"
            ));
        }
        if cfg.legacy_blocks("Low Liquidity")
            && report.total_market_liquidity < cfg.min_total_market_liquidity
        {
            failures.push(format!(
                "Low liquidity: {} < {}",
                report.total_market_liquidity, cfg.min_total_market_liquidity
            ));
        }
        if cfg.legacy_blocks("Freeze Authority still enabled")
            && report.token.freeze_authority.is_some()
        {
            failures.push("Freeze authority still enabled".to_string());
        }
        if cfg.legacy_blocks("Single holder ownership") && holders.iter().any(|h| h.pct > 50.0) {
            failures.push(format!("Single holder ownership: {top_pct}%"));
        }
        if cfg.legacy_blocks("High holder concentration")
            && holders
                .iter()
                .any(|h| h.pct > cfg.max_allowed_pct_topholders)
        {
            failures.push(format!("High holder concentration: {top_pct}%"));
        }
        if cfg.legacy_blocks("Large Amount of LP Unlocked") {
            failures.push("Large amount of LP unlocked".to_string());
        }
        if cfg.legacy_blocks("Low amount of LP Providers")
            && report.total_lp_providers < cfg.min_total_lp_providers
        {
            failures.push(format!(
                "Low amount of LP providers: {}",
                report.total_lp_providers
            ));
        }
        if !cfg.allow_mint_authority && report.token.mint_authority.is_some() {
            failures.push("Mint authority should be null".to_string());
        }
        if !cfg.allow_not_initialized && !report.token.is_initialized {
            failures.push("Token is not initialized".to_string());
        }
        if !cfg.allow_freeze_authority && report.token.freeze_authority.is_some() {
            failures.push("Freeze authority should be null".to_string());
        }
        if !cfg.allow_mutable && report.token_meta.mutable {
            failures.push("Metadata should not be mutable".to_string());
        }
        if !cfg.allow_insider_topholders && holders.iter().any(|h| h.insider) {
            failures.push("Insider accounts among top holders".to_string());
        }
        if report.total_lp_providers < cfg.min_total_lp_providers {
            failures.push(format!(
                "Not enough LP providers: {}",
                report.total_lp_providers
            ));
        }
        if report.market_count() < cfg.min_total_markets {
            failures.push(format!("Not enough markets: {}", report.market_count()));
        }
        if report.total_market_liquidity < cfg.min_total_market_liquidity {
            failures.push(format!(
                "Not enough market liquidity: {}",
                report.total_market_liquidity
            ));
        }
        if !cfg.allow_rugged && report.rugged {
            failures.push("Token is rugged".to_string());
        }
        if cfg.block_symbols.contains(&report.token_meta.symbol) {
            failures.push(format!("Symbol is blocked: {}", report.token_meta.symbol));
        }
        if cfg.block_names.contains(&report.token_meta.name) {
            failures.push(format!("Name is blocked: {}", report.token_meta.name));
        }
        if cfg.max_score != 0 && report.score > cfg.max_score {
            failures.push(format!("Rug score too high: {}", report.score));
        }

        GateVerdict::from_failures(failures)
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }
}
