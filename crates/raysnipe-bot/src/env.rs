//! Environment validation.
//!
//! The wallet secret comes only from the environment, never from the config
//! file, and endpoint URLs are scheme-checked before anything connects —
//! pointing the WebSocket at an HTTP endpoint otherwise fails much later
//! with an opaque handshake error.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Environment variable holding the base58 wallet secret key.
pub const WALLET_KEY_ENV: &str = "RAYSNIPE_WALLET_KEY";

/// Read and sanity-check the wallet key from the environment.
pub fn wallet_key_from_env() -> AppResult<String> {
    let key = std::env::var(WALLET_KEY_ENV)
        .map_err(|_| AppError::Env(format!("{WALLET_KEY_ENV} is not set")))?;
    check_wallet_key(&key)?;
    Ok(key)
}

/// Validate endpoint URL schemes before any connection is attempted.
pub fn validate_config_urls(config: &AppConfig) -> AppResult<()> {
    check_scheme("rpc.http_url", &config.rpc.http_url, "https://")?;
    check_scheme("rpc.ws_url", &config.rpc.ws_url, "wss://")?;
    Ok(())
}

fn check_wallet_key(key: &str) -> AppResult<()> {
    // A base58-encoded 64-byte secret is always 87 or 88 characters.
    if !(87..=88).contains(&key.len()) {
        return Err(AppError::Env(format!(
            "{WALLET_KEY_ENV} must be 87 or 88 characters long (got {})",
            key.len()
        )));
    }
    Ok(())
}

fn check_scheme(name: &str, url: &str, scheme: &str) -> AppResult<()> {
    if !url.starts_with(scheme) {
        return Err(AppError::Env(format!("{name} must start with {scheme}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_key_length_check() {
        assert!(check_wallet_key(&"5".repeat(87)).is_ok());
        assert!(check_wallet_key(&"5".repeat(88)).is_ok());
        assert!(check_wallet_key("short").is_err());
        assert!(check_wallet_key(&"5".repeat(89)).is_err());
    }

    #[test]
    fn test_default_urls_validate() {
        let config = AppConfig::default();
        assert!(validate_config_urls(&config).is_ok());
    }

    #[test]
    fn test_plain_ws_url_rejected() {
        let mut config = AppConfig::default();
        config.rpc.ws_url = "ws://localhost:8900".to_string();

        let err = validate_config_urls(&config).unwrap_err();
        assert!(matches!(err, AppError::Env(_)));
        assert!(err.to_string().contains("rpc.ws_url"));
    }

    #[test]
    fn test_http_url_scheme_rejected() {
        let mut config = AppConfig::default();
        config.rpc.http_url = "http://localhost:8899".to_string();

        assert!(validate_config_urls(&config).is_err());
    }
}
