//! Partial typed view of the rugcheck.xyz token report.
//!
//! Only the fields the gate evaluates are deserialized; the report carries
//! far more.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RugReport {
    #[serde(default)]
    pub creator: Option<String>,
    pub token: TokenInfo,
    #[serde(rename = "tokenMeta")]
    pub token_meta: TokenMeta,
    #[serde(rename = "totalLPProviders", default)]
    pub total_lp_providers: i64,
    #[serde(rename = "totalMarketLiquidity", default)]
    pub total_market_liquidity: f64,
    #[serde(default)]
    pub rugged: bool,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub risks: Vec<RiskItem>,
    #[serde(rename = "topHolders", default)]
    pub top_holders: Vec<TopHolder>,
    #[serde(default)]
    pub markets: Option<Vec<Market>>,
    #[serde(rename = "insiderNetworks", default)]
    pub insider_networks: Option<Vec<InsiderNetwork>>,
}

impl RugReport {
    pub fn market_count(&self) -> i64 {
        self.markets.as_ref().map(|m| m.len() as i64).unwrap_or(0)
    }

    /// Vault addresses of the report's markets, used to drop liquidity
    /// pools from the top-holder list.
    pub fn liquidity_addresses(&self) -> Vec<&str> {
        self.markets
            .as_ref()
            .map(|markets| {
                markets
                    .iter()
                    .flat_map(|m| [m.liquidity_a.as_deref(), m.liquidity_b.as_deref()])
                    .flatten()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    #[serde(rename = "mintAuthority", default)]
    pub mint_authority: Option<String>,
    #[serde(rename = "freezeAuthority", default)]
    pub freeze_authority: Option<String>,
    #[serde(rename = "isInitialized", default)]
    pub is_initialized: bool,
    #[serde(default)]
    pub supply: f64,
    #[serde(default)]
    pub decimals: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub mutable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskItem {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopHolder {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub pct: f64,
    #[serde(default)]
    pub insider: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Market {
    #[serde(rename = "liquidityA", default)]
    pub liquidity_a: Option<String>,
    #[serde(rename = "liquidityB", default)]
    pub liquidity_b: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsiderNetwork {
    #[serde(default)]
    pub size: i64,
    #[serde(rename = "tokenAmount", default)]
    pub token_amount: f64,
}
