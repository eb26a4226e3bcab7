//! Pool-key extraction from the pool-initialization transaction.
//!
//! The initialize2 instruction carries the new pool's accounts at fixed
//! positions: pool state at 4, LP mint at 7, quote mint at 8, base mint at
//! 9, and the two reserve vaults at 10 and 11. The quote side is expected
//! to be wrapped SOL; when the layout differs, mints are recovered from
//! `postTokenBalances` instead.

use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use raysnipe_core::{Address, TxSignature};
use raysnipe_rpc::RpcClient;

use crate::config::DetectorConfig;
use crate::error::{DetectorError, DetectorResult};

const ACCOUNT_IDX_POOL: usize = 4;
const ACCOUNT_IDX_LP_MINT: usize = 7;
const ACCOUNT_IDX_QUOTE_MINT: usize = 8;
const ACCOUNT_IDX_BASE_MINT: usize = 9;
const ACCOUNT_IDX_TOKEN_VAULT: usize = 10;
const ACCOUNT_IDX_SOL_VAULT: usize = 11;

/// Accounts of a freshly initialized pool, already assigned to their roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolKeys {
    pub pool: Address,
    pub token_mint: Address,
    pub sol_mint: Address,
    /// Reserve vault holding the new token.
    pub token_vault: Address,
    /// Reserve vault holding wrapped SOL.
    pub sol_vault: Address,
}

/// Extract pool keys from a jsonParsed pool-initialization transaction.
pub fn extract_pool_keys(tx: &Value, config: &DetectorConfig) -> DetectorResult<PoolKeys> {
    let instructions = tx
        .pointer("/transaction/message/instructions")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            DetectorError::NoPoolInstruction("no instructions in transaction".into())
        })?;

    let instruction = instructions
        .iter()
        .find(|ix| {
            ix.get("programId").and_then(Value::as_str) == Some(config.amm_program_id.as_str())
        })
        .ok_or_else(|| {
            DetectorError::NoPoolInstruction(format!(
                "no instruction for program {}",
                config.amm_program_id
            ))
        })?;

    let accounts = instruction
        .get("accounts")
        .and_then(Value::as_array)
        .ok_or_else(|| DetectorError::InvalidAccounts("accounts missing".into()))?;

    if accounts.len() <= ACCOUNT_IDX_SOL_VAULT {
        return Err(DetectorError::InvalidAccounts(format!(
            "expected at least {} accounts, got {}",
            ACCOUNT_IDX_SOL_VAULT + 1,
            accounts.len()
        )));
    }

    let account_at = |idx: usize| -> DetectorResult<Address> {
        accounts[idx]
            .as_str()
            .map(Address::from)
            .ok_or_else(|| DetectorError::InvalidAccounts(format!("account {idx} not a string")))
    };

    let pool = account_at(ACCOUNT_IDX_POOL)?;
    let lp_mint = account_at(ACCOUNT_IDX_LP_MINT)?;
    let quote_mint = account_at(ACCOUNT_IDX_QUOTE_MINT)?;
    let base_mint = account_at(ACCOUNT_IDX_BASE_MINT)?;
    let token_vault = account_at(ACCOUNT_IDX_TOKEN_VAULT)?;
    let sol_vault = account_at(ACCOUNT_IDX_SOL_VAULT)?;

    let mut sol_mint: Option<Address> = None;
    let mut token_mint: Option<Address> = None;

    if quote_mint == config.wsol_mint {
        sol_mint = Some(quote_mint);
        token_mint = Some(base_mint);
    }

    // Fallback for layouts where the quote side is not wSOL: recover the
    // mints from the post-transaction token balances, skipping the LP mint.
    if sol_mint.is_none() || token_mint.is_none() {
        if let Some(balances) = tx
            .pointer("/meta/postTokenBalances")
            .and_then(Value::as_array)
        {
            for balance in balances {
                let Some(mint) = balance.get("mint").and_then(Value::as_str) else {
                    continue;
                };

                if mint == config.wsol_mint.as_str() {
                    sol_mint = Some(Address::from(mint));
                } else if mint != lp_mint.as_str() {
                    token_mint = Some(Address::from(mint));
                }
            }
        }
    }

    let (Some(sol_mint), Some(token_mint)) = (sol_mint, token_mint) else {
        return Err(DetectorError::MintsNotFound);
    };

    debug!(
        pool = %pool,
        token_mint = %token_mint,
        token_vault = %token_vault,
        sol_vault = %sol_vault,
        "Extracted pool keys"
    );

    Ok(PoolKeys {
        pool,
        token_mint,
        sol_mint,
        token_vault,
        sol_vault,
    })
}

/// Fetch the pool-creation transaction and extract its keys, retrying with
/// capped exponential backoff while the transaction propagates.
pub async fn fetch_pool_keys(
    rpc: &RpcClient,
    signature: &TxSignature,
    config: &DetectorConfig,
) -> DetectorResult<PoolKeys> {
    info!(
        delay_ms = config.fetch_tx_initial_delay_ms,
        "Waiting for pool-creation transaction to confirm"
    );
    sleep(Duration::from_millis(config.fetch_tx_initial_delay_ms)).await;

    for attempt in 1..=config.fetch_tx_max_retries {
        debug!(
            attempt,
            max = config.fetch_tx_max_retries,
            signature = %signature,
            "Fetching pool-creation transaction"
        );

        match rpc.get_transaction(signature).await {
            Ok(Some(tx)) => match extract_pool_keys(&tx, config) {
                Ok(keys) => return Ok(keys),
                Err(e) => warn!(attempt, error = %e, "Pool-key extraction failed"),
            },
            Ok(None) => warn!(attempt, "Transaction not found yet"),
            Err(e) => warn!(attempt, error = %e, "Transaction fetch failed"),
        }

        if attempt < config.fetch_tx_max_retries {
            let delay_ms = (4_000.0 * 1.5_f64.powi(attempt as i32)).min(15_000.0) as u64;
            debug!(delay_ms, "Backing off before next fetch attempt");
            sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    Err(DetectorError::RetriesExhausted {
        attempts: config.fetch_tx_max_retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const WSOL: &str = "So11111111111111111111111111111111111111112";
    const AMM: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

    fn init_tx(quote_mint: &str) -> Value {
        let accounts = vec![
            "spl-token-program",                            // 0
            "system-program",                               // 1
            "rent-sysvar",                                  // 2
            "amm-authority",                                // 3
            "3zvuhrmWtcMRs41KEtwfx1wNnkXsbivot7AtoA5dvx2E", // 4 pool
            "open-orders",                                  // 5
            "target-orders",                                // 6
            "LPmint111111111111111111111111111111111111",   // 7 LP mint
            quote_mint,                                     // 8 quote mint
            "Ba4HgVv5mr3Cz1PJr4s9PmemcPSqB6GPfcdev5xppump", // 9 base mint
            "FvHwEZGVUW2VfYwTJ26boywb8ES216DC4sJgJbfJZqLM", // 10 token vault
            "H6hgxFc8uYxtRcSiPsuLcnW1eFANkGGCNN9Xe3iWxiyG", // 11 SOL vault
            "serum-market",                                 // 12
        ];

        json!({
            "transaction": {
                "message": {
                    "instructions": [
                        {"programId": "ComputeBudget111111111111111111111111111111", "data": "xx"},
                        {"programId": AMM, "accounts": accounts},
                    ]
                }
            },
            "meta": {
                "postTokenBalances": [
                    {"mint": WSOL, "owner": "amm-authority"},
                    {"mint": "Ba4HgVv5mr3Cz1PJr4s9PmemcPSqB6GPfcdev5xppump", "owner": "amm-authority"},
                    {"mint": "LPmint111111111111111111111111111111111111", "owner": "creator"},
                ]
            }
        })
    }

    #[test]
    fn test_extract_with_wsol_quote() {
        let config = DetectorConfig::default();
        let keys = extract_pool_keys(&init_tx(WSOL), &config).unwrap();

        assert_eq!(keys.pool.as_str(), "3zvuhrmWtcMRs41KEtwfx1wNnkXsbivot7AtoA5dvx2E");
        assert_eq!(keys.sol_mint.as_str(), WSOL);
        assert_eq!(
            keys.token_mint.as_str(),
            "Ba4HgVv5mr3Cz1PJr4s9PmemcPSqB6GPfcdev5xppump"
        );
        assert_eq!(
            keys.token_vault.as_str(),
            "FvHwEZGVUW2VfYwTJ26boywb8ES216DC4sJgJbfJZqLM"
        );
        assert_eq!(
            keys.sol_vault.as_str(),
            "H6hgxFc8uYxtRcSiPsuLcnW1eFANkGGCNN9Xe3iWxiyG"
        );
    }

    #[test]
    fn test_extract_falls_back_to_post_token_balances() {
        // Quote slot holds something other than wSOL; the mints must come
        // from postTokenBalances, still excluding the LP mint.
        let config = DetectorConfig::default();
        let keys =
            extract_pool_keys(&init_tx("USDC11111111111111111111111111111111111111"), &config)
                .unwrap();

        assert_eq!(keys.sol_mint.as_str(), WSOL);
        assert_eq!(
            keys.token_mint.as_str(),
            "Ba4HgVv5mr3Cz1PJr4s9PmemcPSqB6GPfcdev5xppump"
        );
    }

    #[test]
    fn test_extract_rejects_missing_program_instruction() {
        let config = DetectorConfig::default();
        let tx = json!({
            "transaction": {"message": {"instructions": [
                {"programId": "SomeOtherProgram", "accounts": []}
            ]}},
            "meta": {}
        });

        assert!(matches!(
            extract_pool_keys(&tx, &config),
            Err(DetectorError::NoPoolInstruction(_))
        ));
    }

    #[test]
    fn test_extract_rejects_short_accounts() {
        let config = DetectorConfig::default();
        let tx = json!({
            "transaction": {"message": {"instructions": [
                {"programId": AMM, "accounts": ["a", "b", "c"]}
            ]}},
            "meta": {}
        });

        assert!(matches!(
            extract_pool_keys(&tx, &config),
            Err(DetectorError::InvalidAccounts(_))
        ));
    }
}
