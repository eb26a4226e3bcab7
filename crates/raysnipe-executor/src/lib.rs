//! Jupiter swap execution for raysnipe.
//!
//! One engine handles both sides of the position's life: the entry swap
//! (SOL to token, with cost-basis extraction from the confirmed
//! transaction) and the exit swap (token back to SOL, with an on-chain
//! balance check first). Transactions come pre-built from Jupiter's swap
//! API and are signed locally before being sent and confirmed over
//! JSON-RPC.

pub mod config;
pub mod engine;
pub mod entry;
pub mod error;
pub mod jupiter;
pub mod wallet;

pub use config::ExecutorConfig;
pub use engine::SwapEngine;
pub use entry::EntryDetails;
pub use error::{ExecutorError, ExecutorResult};
pub use jupiter::{JupiterClient, QuoteResponse};
pub use wallet::TradingWallet;
