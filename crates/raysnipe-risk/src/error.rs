//! Risk gate error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Malformed report: {0}")]
    Malformed(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
