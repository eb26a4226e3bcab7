//! Executor error types.

use thiserror::Error;

/// Errors raised while building, signing, sending or confirming swaps.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Invalid wallet key: {0}")]
    InvalidWalletKey(String),

    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    #[error("Jupiter request failed: {0}")]
    Jupiter(String),

    #[error("No usable quote: {0}")]
    QuoteUnavailable(String),

    #[error("Transaction signing failed: {0}")]
    Signing(String),

    #[error("Transaction {0} not confirmed")]
    Unconfirmed(String),

    #[error("Cost-basis extraction failed: {0}")]
    CostBasis(String),

    /// The wallet's on-chain balance differs from the tracked position;
    /// nothing was sold.
    #[error("Exit balance mismatch: tracked {expected} raw units, wallet holds {found}")]
    BalanceMismatch { expected: u128, found: u128 },

    #[error(transparent)]
    Rpc(#[from] raysnipe_rpc::RpcError),
}

pub type ExecutorResult<T> = std::result::Result<T, ExecutorError>;
