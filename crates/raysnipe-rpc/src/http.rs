//! HTTP JSON-RPC client.
//!
//! Thin typed wrappers over the handful of methods the bot needs. Every
//! request carries an explicit timeout; transient failures surface as
//! `RpcError` and are retried (or not) by the caller.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use raysnipe_core::{Address, Slot, TxSignature};

use crate::error::{RpcError, RpcResult};
use crate::message::{RpcContext, SignatureStatus};

/// Point-in-time token-account balance, with the slot it was observed at.
#[derive(Debug, Clone, Copy)]
pub struct TokenBalance {
    /// Raw amount in base units.
    pub amount: u128,
    /// Mint decimals.
    pub decimals: u32,
    /// Slot the read was served at.
    pub slot: Slot,
}

#[derive(Debug, Deserialize)]
struct TokenBalanceResult {
    context: RpcContext,
    value: TokenBalanceValue,
}

#[derive(Debug, Deserialize)]
struct TokenBalanceValue {
    amount: String,
    decimals: u32,
}

#[derive(Debug, Deserialize)]
struct SignatureStatusesResult {
    value: Vec<Option<SignatureStatus>>,
}

/// JSON-RPC 2.0 client over HTTP.
#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Http(format!("{method} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RpcError::Http(format!("{method} HTTP {status}: {text}")));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|e| RpcError::Malformed(format!("{method} response: {e}")))?;

        if let Some(err) = reply.get("error") {
            let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            return Err(RpcError::Rpc { code, message });
        }

        reply
            .get("result")
            .cloned()
            .ok_or_else(|| RpcError::Malformed(format!("{method} reply carries no result")))
    }

    /// One-shot token-account balance read.
    pub async fn get_token_account_balance(&self, account: &Address) -> RpcResult<TokenBalance> {
        let result = self
            .call("getTokenAccountBalance", json!([account.as_str()]))
            .await?;

        let parsed: TokenBalanceResult = serde_json::from_value(result)
            .map_err(|e| RpcError::Malformed(format!("token balance: {e}")))?;

        let amount = parsed
            .value
            .amount
            .parse::<u128>()
            .map_err(|e| RpcError::Malformed(format!("token amount: {e}")))?;

        debug!(
            account = %account,
            amount,
            slot = parsed.context.slot,
            "Token account balance read"
        );

        Ok(TokenBalance {
            amount,
            decimals: parsed.value.decimals,
            slot: parsed.context.slot,
        })
    }

    /// Fetch a transaction in jsonParsed encoding. `None` when the node does
    /// not know the signature (yet).
    pub async fn get_transaction(&self, signature: &TxSignature) -> RpcResult<Option<Value>> {
        let result = self
            .call(
                "getTransaction",
                json!([
                    signature.as_str(),
                    {
                        "maxSupportedTransactionVersion": 0,
                        "encoding": "jsonParsed",
                        "commitment": "confirmed",
                    }
                ]),
            )
            .await?;

        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(result))
    }

    /// True when the signature has reached confirmed (or finalized)
    /// commitment without an execution error.
    pub async fn is_confirmed(&self, signature: &TxSignature) -> RpcResult<bool> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature.as_str()], {"searchTransactionHistory": true}]),
            )
            .await?;

        let parsed: SignatureStatusesResult = serde_json::from_value(result)
            .map_err(|e| RpcError::Malformed(format!("signature statuses: {e}")))?;

        Ok(parsed
            .value
            .first()
            .and_then(|s| s.as_ref())
            .map(SignatureStatus::is_confirmed)
            .unwrap_or(false))
    }

    /// Submit a signed, base64-encoded transaction.
    pub async fn send_transaction(&self, tx_base64: &str) -> RpcResult<TxSignature> {
        let result = self
            .call(
                "sendTransaction",
                json!([
                    tx_base64,
                    {
                        "encoding": "base64",
                        "skipPreflight": true,
                        "maxRetries": 2,
                    }
                ]),
            )
            .await?;

        let signature = result
            .as_str()
            .ok_or_else(|| RpcError::Malformed("sendTransaction reply is not a string".into()))?;

        Ok(TxSignature::new(signature))
    }

    /// Sum of the owner's raw balances across all token accounts of a mint.
    /// Used for the exit-time balance check.
    pub async fn token_balance_by_owner(
        &self,
        owner: &Address,
        mint: &Address,
    ) -> RpcResult<u128> {
        let result = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.as_str(),
                    {"mint": mint.as_str()},
                    {"encoding": "jsonParsed"}
                ]),
            )
            .await?;

        let accounts = result
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| RpcError::Malformed("token accounts reply has no value".into()))?;

        let mut total: u128 = 0;
        for account in accounts {
            let amount = account
                .pointer("/account/data/parsed/info/tokenAmount/amount")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<u128>().ok())
                .unwrap_or(0);
            total = total.saturating_add(amount);
        }

        Ok(total)
    }
}
