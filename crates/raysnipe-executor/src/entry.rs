//! Cost-basis extraction from the confirmed entry swap.
//!
//! The entry transaction is fetched in jsonParsed encoding and mined for
//! two figures: the SOL actually spent (the spl-token transfer out of the
//! wallet's wSOL account, buried in the inner instructions) and the tokens
//! actually received (the wallet's entry in `postTokenBalances`). Together
//! with a one-time SOL/USD price they fix the position's cost basis for its
//! whole lifetime.

use rust_decimal::Decimal;
use serde_json::Value;

use raysnipe_core::{Address, Price, TokenAmount};

use crate::error::{ExecutorError, ExecutorResult};

const LAMPORTS_PER_SOL_DECIMALS: u32 = 9;

/// Cost basis of a confirmed entry swap.
#[derive(Debug, Clone)]
pub struct EntryDetails {
    /// SOL spent on the entry, including what the route consumed.
    pub sol_spent: Decimal,
    /// Tokens received, UI units.
    pub tokens_received: TokenAmount,
    /// Tokens received in raw base units; becomes the exit swap amount.
    pub tokens_received_raw: u128,
    /// SOL/USD at entry time. Reused for every later PnL computation.
    pub sol_price_usd: Decimal,
    /// Cost basis per token, USD.
    pub purchase_price_usd: Price,
    /// USD value of the SOL spent.
    pub sol_paid_usd: Decimal,
    /// Block time of the entry transaction, when the node reports one.
    pub block_time: Option<i64>,
}

impl EntryDetails {
    /// Extract the cost basis from a jsonParsed entry transaction.
    ///
    /// `wsol_ata` is the wallet's wrapped-SOL associated token account: the
    /// swap route pulls its input from there, so the transfer sourced from
    /// it is the SOL side of the trade.
    pub fn from_transaction(
        tx: &Value,
        token_mint: &Address,
        wallet: &Address,
        wsol_ata: &Address,
        sol_price_usd: Decimal,
    ) -> ExecutorResult<Self> {
        let sol_spent = sol_spent_lamports(tx, wsol_ata)
            .ok_or_else(|| {
                ExecutorError::CostBasis(format!(
                    "no spl-token transfer out of wSOL account {wsol_ata}"
                ))
            })
            .and_then(scale_lamports)?;

        let (tokens_received, tokens_received_raw) = tokens_received(tx, token_mint, wallet)
            .ok_or_else(|| {
                ExecutorError::CostBasis(format!(
                    "no post-balance for mint {token_mint} owned by {wallet}"
                ))
            })?;

        if sol_spent.is_zero() || tokens_received.is_zero() {
            return Err(ExecutorError::CostBasis(format!(
                "unusable swap amounts: {sol_spent} SOL for {tokens_received} tokens"
            )));
        }

        let sol_paid_usd = sol_spent * sol_price_usd;
        let purchase_price_usd = Price::new(sol_paid_usd / tokens_received.inner());

        Ok(Self {
            sol_spent,
            tokens_received,
            tokens_received_raw,
            sol_price_usd,
            purchase_price_usd,
            sol_paid_usd,
            block_time: tx.get("blockTime").and_then(Value::as_i64),
        })
    }
}

/// The raw lamport amount of the first spl-token transfer sourced from the
/// wallet's wSOL account, scanning the inner instructions.
fn sol_spent_lamports(tx: &Value, wsol_ata: &Address) -> Option<u64> {
    let inner = tx.pointer("/meta/innerInstructions")?.as_array()?;

    for group in inner {
        let Some(instructions) = group.get("instructions").and_then(Value::as_array) else {
            continue;
        };
        for ix in instructions {
            if ix.get("program").and_then(Value::as_str) != Some("spl-token") {
                continue;
            }
            if ix.pointer("/parsed/type").and_then(Value::as_str) != Some("transfer") {
                continue;
            }
            if ix.pointer("/parsed/info/source").and_then(Value::as_str)
                != Some(wsol_ata.as_str())
            {
                continue;
            }

            return ix
                .pointer("/parsed/info/amount")
                .and_then(Value::as_str)
                .and_then(|s| s.parse::<u64>().ok());
        }
    }

    None
}

/// The wallet's post-transaction balance of the bought token, as UI units
/// plus the exact raw amount.
fn tokens_received(tx: &Value, token_mint: &Address, wallet: &Address) -> Option<(TokenAmount, u128)> {
    let balances = tx.pointer("/meta/postTokenBalances")?.as_array()?;

    for balance in balances {
        if balance.get("mint").and_then(Value::as_str) != Some(token_mint.as_str()) {
            continue;
        }
        if balance.get("owner").and_then(Value::as_str) != Some(wallet.as_str()) {
            continue;
        }

        let raw = balance
            .pointer("/uiTokenAmount/amount")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<u128>().ok())?;
        let ui = balance
            .pointer("/uiTokenAmount/uiAmountString")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<Decimal>().ok())?;

        return Some((TokenAmount::new(ui), raw));
    }

    None
}

fn scale_lamports(lamports: u64) -> ExecutorResult<Decimal> {
    Decimal::try_from_i128_with_scale(i128::from(lamports), LAMPORTS_PER_SOL_DECIMALS)
        .map_err(|e| ExecutorError::CostBasis(format!("lamport amount {lamports}: {e}")))
}
