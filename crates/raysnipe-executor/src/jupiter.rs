//! Jupiter aggregator client: quotes, swap transactions, SOL price.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{debug, warn};

use raysnipe_core::Address;

use crate::config::ExecutorConfig;
use crate::error::{ExecutorError, ExecutorResult};

/// A quote from the quote API.
///
/// Only the amounts are read here; everything else is round-tripped
/// untouched because the swap API expects the quote back verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub in_amount: String,
    pub out_amount: String,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    quote_response: &'a QuoteResponse,
    user_public_key: &'a str,
    wrap_and_unwrap_sol: bool,
    dynamic_slippage: DynamicSlippage,
    prioritization_fee_lamports: PrioritizationFee,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DynamicSlippage {
    max_bps: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrioritizationFee {
    priority_level_with_max_lamports: PriorityLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PriorityLevel {
    max_lamports: u64,
    priority_level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
}

/// HTTP client for the Jupiter quote, swap and price APIs.
#[derive(Clone)]
pub struct JupiterClient {
    client: Client,
    config: ExecutorConfig,
}

impl JupiterClient {
    pub fn new(config: ExecutorConfig) -> ExecutorResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ExecutorError::Jupiter(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Request a quote, retrying while Jupiter still reports the token as
    /// not tradable. Freshly initialized pools take a few seconds to appear
    /// in the router; any other error is fatal for the attempt.
    pub async fn quote(
        &self,
        input_mint: &Address,
        output_mint: &Address,
        amount: u128,
        slippage_bps: u32,
    ) -> ExecutorResult<QuoteResponse> {
        let amount = amount.to_string();
        let slippage = slippage_bps.to_string();
        let params = [
            ("inputMint", input_mint.as_str()),
            ("outputMint", output_mint.as_str()),
            ("amount", amount.as_str()),
            ("slippageBps", slippage.as_str()),
        ];

        for attempt in 1..=self.config.not_tradable_retries {
            let response = self
                .client
                .get(&self.config.quote_url)
                .query(&params)
                .send()
                .await
                .map_err(|e| ExecutorError::Jupiter(format!("quote request failed: {e}")))?;

            let status = response.status();
            if status == StatusCode::BAD_REQUEST {
                let body: Value = response.json().await.unwrap_or(Value::Null);
                if body.get("errorCode").and_then(Value::as_str) == Some("TOKEN_NOT_TRADABLE") {
                    debug!(
                        attempt,
                        max = self.config.not_tradable_retries,
                        output_mint = %output_mint,
                        "Token not tradable yet, retrying quote"
                    );
                    sleep(Duration::from_millis(self.config.not_tradable_delay_ms)).await;
                    continue;
                }
                return Err(ExecutorError::QuoteUnavailable(body.to_string()));
            }
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(ExecutorError::Jupiter(format!("quote HTTP {status}: {text}")));
            }

            let quote: QuoteResponse = response
                .json()
                .await
                .map_err(|e| ExecutorError::Jupiter(format!("quote response: {e}")))?;
            debug!(
                in_amount = %quote.in_amount,
                out_amount = %quote.out_amount,
                "Swap quote received"
            );
            return Ok(quote);
        }

        Err(ExecutorError::QuoteUnavailable(format!(
            "token {output_mint} still not tradable after {} attempts",
            self.config.not_tradable_retries
        )))
    }

    /// Turn a quote into an unsigned, base64-encoded swap transaction.
    pub async fn swap_transaction(
        &self,
        quote: &QuoteResponse,
        user_public_key: &str,
        priority_fee_max_lamports: u64,
    ) -> ExecutorResult<String> {
        let request = SwapRequest {
            quote_response: quote,
            user_public_key,
            wrap_and_unwrap_sol: true,
            dynamic_slippage: DynamicSlippage {
                max_bps: self.config.dynamic_slippage_max_bps,
            },
            prioritization_fee_lamports: PrioritizationFee {
                priority_level_with_max_lamports: PriorityLevel {
                    max_lamports: priority_fee_max_lamports,
                    priority_level: self.config.priority_level.clone(),
                },
            },
        };

        let response = self
            .client
            .post(&self.config.swap_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ExecutorError::Jupiter(format!("swap request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExecutorError::Jupiter(format!("swap HTTP {status}: {text}")));
        }

        let swap: SwapResponse = response
            .json()
            .await
            .map_err(|e| ExecutorError::Jupiter(format!("swap response: {e}")))?;

        Ok(swap.swap_transaction)
    }

    /// Current SOL/USD price. Fetched once at entry; the rate is reused for
    /// every PnL computation on this position.
    pub async fn sol_price_usd(&self, sol_mint: &Address) -> ExecutorResult<Decimal> {
        let response = self
            .client
            .get(&self.config.price_url)
            .query(&[("ids", sol_mint.as_str())])
            .send()
            .await
            .map_err(|e| ExecutorError::Jupiter(format!("price request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExecutorError::Jupiter(format!("price HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExecutorError::Jupiter(format!("price response: {e}")))?;

        let price = body
            .pointer(&format!("/data/{}/price", sol_mint.as_str()))
            .and_then(value_as_decimal)
            .ok_or_else(|| {
                ExecutorError::Jupiter(format!("no price for {sol_mint} in response"))
            })?;

        if price <= Decimal::ZERO {
            warn!(%price, "Non-positive SOL price from Jupiter");
            return Err(ExecutorError::Jupiter(format!("unusable SOL price {price}")));
        }

        Ok(price)
    }
}

/// The price API has returned prices both as JSON numbers and as strings
/// across versions; accept either.
fn value_as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}
