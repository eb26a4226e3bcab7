//! raysnipe application: configuration, wiring and the position lifecycle.
//!
//! Everything above the transport and domain crates lives here:
//! - [`AppConfig`]: the composed TOML configuration
//! - [`LifecycleController`]: pool signal → gate → entry → monitor → ready
//! - [`RpcChainReader`]: the monitor's chain seam over the RPC clients
//! - [`Application`]: detection feed loop and shutdown handling

pub mod app;
pub mod chain;
pub mod config;
pub mod controller;
pub mod env;
pub mod error;

pub use app::Application;
pub use chain::RpcChainReader;
pub use config::{AppConfig, ControllerConfig, RpcConfig};
pub use controller::LifecycleController;
pub use env::{validate_config_urls, wallet_key_from_env, WALLET_KEY_ENV};
pub use error::{AppError, AppResult};
