//! Error types for raysnipe-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Reserve out of range: {0}")]
    ReserveOutOfRange(String),

    #[error("Unsupported decimal precision: {0}")]
    UnsupportedPrecision(u32),

    #[error("Invalid cost basis: {0}")]
    InvalidCostBasis(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
