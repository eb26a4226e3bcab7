//! Core domain types for the raysnipe pool sniper.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Address`, `TxSignature`: opaque base58 identifiers
//! - `Price`, `TokenAmount`: precision-safe numeric types
//! - `pnl`: the pure unrealized-PnL calculator over pool reserves

pub mod decimal;
pub mod error;
pub mod ids;
pub mod pnl;

pub use decimal::{Price, TokenAmount};
pub use error::{CoreError, CoreResult};
pub use ids::{Address, Slot, TxSignature};
pub use pnl::{unrealized_pnl, PnlInput, PnlSnapshot};
