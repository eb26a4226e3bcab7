//! Pure unrealized-PnL calculator over pool reserves.
//!
//! Reconstructs the live token price from the pool's two vault balances and
//! compares the position's current value against its cost basis. No I/O;
//! the vault monitor feeds it slot-synchronized reserve snapshots.
//!
//! Reserves arrive as raw integer amounts (lamports / token base units) and
//! are scaled by their mint decimals using exact decimal arithmetic — a
//! binary float here would accumulate rounding error across thousands of
//! reserve updates.

use rust_decimal::Decimal;

use crate::decimal::{Price, TokenAmount};
use crate::error::{CoreError, CoreResult};

/// Prices outside this band are almost certainly a decode or decimals
/// problem rather than a real market price; callers log them but keep going.
const SUSPECT_PRICE_MAX: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
const SUSPECT_PRICE_MIN: Decimal = Decimal::from_parts(1, 0, 0, false, 7);

/// Inputs for one PnL computation.
///
/// `token_reserve` / `sol_reserve` are the raw vault balances from the same
/// ledger slot. The cost-basis fields are fixed at entry and never change
/// for the lifetime of the position.
#[derive(Debug, Clone)]
pub struct PnlInput {
    pub token_reserve: u128,
    pub sol_reserve: u128,
    pub token_decimals: u32,
    pub sol_decimals: u32,
    /// Quantity acquired at entry, UI units.
    pub token_balance: TokenAmount,
    /// SOL spent at entry.
    pub sol_paid: Decimal,
    /// USD value of the SOL spent at entry.
    pub sol_paid_usd: Decimal,
    /// Price to report while a reserve side is still empty (the entry price).
    pub fallback_price: Price,
}

/// Result of one PnL computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PnlSnapshot {
    /// Current USD price per token.
    pub price_usd: Price,
    /// Current USD value of the held balance.
    pub current_value: Decimal,
    /// Unrealized PnL in USD.
    pub pnl_usd: Decimal,
    /// Unrealized PnL as a percentage of the cost basis.
    pub pnl_percent: Decimal,
}

impl PnlSnapshot {
    /// True when the position is currently in profit.
    pub fn is_gain(&self) -> bool {
        self.pnl_usd.is_sign_positive() && !self.pnl_usd.is_zero()
    }

    /// True when the computed price falls outside the sanity band.
    pub fn price_is_suspect(&self) -> bool {
        let p = self.price_usd.inner();
        p > SUSPECT_PRICE_MAX || p < SUSPECT_PRICE_MIN
    }
}

/// Compute the unrealized PnL for a position given a synchronized pair of
/// vault reserves.
///
/// - Either reserve at zero returns the fallback price unchanged: the pool
///   has not reported usable reserves yet and dividing would be meaningless.
/// - The USD conversion reuses the SOL/USD rate implied by the entry trade
///   (`sol_paid_usd / sol_paid`) instead of fetching a fresh rate on every
///   reserve update.
pub fn unrealized_pnl(input: &PnlInput) -> CoreResult<PnlSnapshot> {
    let price_usd = if input.token_reserve == 0 || input.sol_reserve == 0 {
        input.fallback_price
    } else {
        if input.sol_paid.is_zero() {
            return Err(CoreError::InvalidCostBasis(
                "sol_paid is zero; cannot derive the entry SOL/USD rate".to_string(),
            ));
        }

        let sol_side = scale_reserve(input.sol_reserve, input.sol_decimals)?;
        let token_side = scale_reserve(input.token_reserve, input.token_decimals)?;

        // SOL per token, then through the entry trade's SOL/USD rate.
        let raw_price = sol_side / token_side;
        let sol_usd_rate = input.sol_paid_usd / input.sol_paid;
        Price::new(raw_price * sol_usd_rate)
    };

    let current_value = input.token_balance.notional(price_usd);
    let pnl_usd = current_value - input.sol_paid_usd;
    let pnl_percent = if input.sol_paid_usd.is_zero() {
        Decimal::ZERO
    } else {
        pnl_usd / input.sol_paid_usd * Decimal::from(100)
    };

    Ok(PnlSnapshot {
        price_usd,
        current_value,
        pnl_usd,
        pnl_percent,
    })
}

/// Scale a raw integer reserve by its mint decimals, exactly.
fn scale_reserve(reserve: u128, decimals: u32) -> CoreResult<Decimal> {
    if decimals > 28 {
        return Err(CoreError::UnsupportedPrecision(decimals));
    }

    let mantissa = i128::try_from(reserve)
        .map_err(|_| CoreError::ReserveOutOfRange(reserve.to_string()))?;

    Decimal::try_from_i128_with_scale(mantissa, decimals)
        .map_err(|_| CoreError::ReserveOutOfRange(reserve.to_string()))
}
