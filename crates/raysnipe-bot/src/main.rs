//! raysnipe entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Raydium new-pool sniper with a single-flight position lifecycle.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via RAYSNIPE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    raysnipe_rpc::init_crypto();

    let args = Args::parse();

    raysnipe_telemetry::init_logging()?;

    info!("Starting raysnipe v{}", env!("CARGO_PKG_VERSION"));

    // Determine config path: CLI arg > RAYSNIPE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("RAYSNIPE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = raysnipe_bot::AppConfig::load(&config_path)?;

    raysnipe_bot::validate_config_urls(&config)?;
    let wallet_key = raysnipe_bot::wallet_key_from_env()?;

    let app = raysnipe_bot::Application::new(config, &wallet_key)?;
    app.run().await?;

    Ok(())
}
