//! Application configuration.
//!
//! Every section is owned by the crate it configures; this module only
//! composes them and loads the TOML file. All fields carry serde defaults,
//! so an empty file (or none at all) yields a runnable configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use raysnipe_detector::DetectorConfig;
use raysnipe_executor::ExecutorConfig;
use raysnipe_position::{ExitPolicy, MonitorConfig};
use raysnipe_risk::RugCheckConfig;

use crate::error::{AppError, AppResult};

/// JSON-RPC endpoints and commitments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_http_url")]
    pub http_url: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Timeout for HTTP JSON-RPC requests (ms).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Commitment for the pool-creation log subscription. Processed trades
    /// confirmation lag for being first in line on brand-new pools.
    #[serde(default = "default_logs_commitment")]
    pub logs_commitment: String,
    /// Commitment for the vault account subscriptions.
    #[serde(default = "default_account_commitment")]
    pub account_commitment: String,
}

fn default_http_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_ws_url() -> String {
    "wss://api.mainnet-beta.solana.com".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_logs_commitment() -> String {
    "processed".to_string()
}

fn default_account_commitment() -> String {
    "confirmed".to_string()
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            http_url: default_http_url(),
            ws_url: default_ws_url(),
            request_timeout_ms: default_request_timeout_ms(),
            logs_commitment: default_logs_commitment(),
            account_commitment: default_account_commitment(),
        }
    }
}

/// Lifecycle controller pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Settle delay between the risk gate passing and the entry swap (ms).
    #[serde(default = "default_entry_delay_ms")]
    pub entry_delay_ms: u64,
    /// Delay between opening the position and starting the vault monitor
    /// (ms), giving the pool's first trades time to land.
    #[serde(default = "default_monitor_start_delay_ms")]
    pub monitor_start_delay_ms: u64,
}

fn default_entry_delay_ms() -> u64 {
    1_000
}

fn default_monitor_start_delay_ms() -> u64 {
    10_000
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            entry_delay_ms: default_entry_delay_ms(),
            monitor_start_delay_ms: default_monitor_start_delay_ms(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub rug_check: RugCheckConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub exit: ExitPolicy,
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl AppConfig {
    /// Load configuration, falling back to defaults when the file does not
    /// exist.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}
