//! Position lifecycle error types.

use thiserror::Error;

/// Errors surfaced by a [`crate::ChainReader`] implementation.
///
/// The monitor treats read failures as transient (the next notification
/// retries independently) and subscription failures as fatal for the run.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Balance read failed: {0}")]
    Read(String),

    #[error("Subscription failed: {0}")]
    Subscribe(String),
}

/// Errors surfaced by an [`crate::ExitSwap`] implementation.
#[derive(Debug, Error)]
pub enum ExitSwapError {
    /// On-chain balance differs from the tracked position; nothing was sold.
    #[error("Balance mismatch at exit: {0}")]
    BalanceMismatch(String),

    /// The swap could not be built, sent or confirmed.
    #[error("Exit swap failed: {0}")]
    Failed(String),
}
