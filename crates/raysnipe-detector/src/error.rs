//! Detector error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("No pool-initialization instruction in transaction: {0}")]
    NoPoolInstruction(String),

    #[error("Invalid accounts array in pool instruction: {0}")]
    InvalidAccounts(String),

    #[error("Required mints not found in transaction")]
    MintsNotFound,

    #[error("Transaction fetch failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("RPC error: {0}")]
    Rpc(#[from] raysnipe_rpc::RpcError),
}

pub type DetectorResult<T> = Result<T, DetectorError>;
