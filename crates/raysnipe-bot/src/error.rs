//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment error: {0}")]
    Env(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] raysnipe_rpc::RpcError),

    #[error("Detector error: {0}")]
    Detector(#[from] raysnipe_detector::DetectorError),

    #[error("Risk gate error: {0}")]
    Risk(#[from] raysnipe_risk::RiskError),

    #[error("Executor error: {0}")]
    Executor(#[from] raysnipe_executor::ExecutorError),

    #[error("Chain error: {0}")]
    Chain(#[from] raysnipe_position::ChainError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] raysnipe_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
