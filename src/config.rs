//! Application settings loaded from environment variables.
//!
//! Settings are read once in the server binary and injected into the
//! components that need them. Validation happens here so a misconfigured
//! process refuses to start instead of failing on its first request.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("missing required environment variable: {var}")]
    Missing { var: &'static str },

    /// An environment variable holds a value that fails validation.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Validated application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Application name used in discovery and log output.
    pub app_name: String,
    /// Finnhub API key for market data requests.
    pub finnhub_api_key: String,
    /// Base URL of the Finnhub REST API.
    pub finnhub_base_url: String,
    /// Port for the HTTP REST API server (1024..=65535).
    pub port: u16,
    /// Timeout applied to outbound provider requests.
    pub api_timeout: Duration,
}

impl Settings {
    /// Load settings from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `FINNHUB_API_KEY` (required)
    /// - `FINNHUB_BASE_URL` (default `https://finnhub.io/api/v1`)
    /// - `MCP_PORT` (default 9001, must be in 1024..=65535)
    /// - `API_TIMEOUT` (seconds, default 30, must be in 1..=300)
    /// - `APP_NAME` (default "Market Data Server")
    pub fn from_env() -> Result<Self, ConfigError> {
        let finnhub_api_key = std::env::var("FINNHUB_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing {
                var: "FINNHUB_API_KEY",
            })?;

        let port = parse_range("MCP_PORT", 9001u32, 1024, 65535)? as u16;
        let timeout_secs = parse_range("API_TIMEOUT", 30u32, 1, 300)?;

        Ok(Self {
            app_name: std::env::var("APP_NAME")
                .unwrap_or_else(|_| "Market Data Server".to_string()),
            finnhub_api_key,
            finnhub_base_url: std::env::var("FINNHUB_BASE_URL")
                .unwrap_or_else(|_| "https://finnhub.io/api/v1".to_string()),
            port,
            api_timeout: Duration::from_secs(timeout_secs as u64),
        })
    }
}

fn parse_range(var: &'static str, default: u32, min: u32, max: u32) -> Result<u32, ConfigError> {
    let raw = match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return Ok(default),
    };
    let value: u32 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        reason: format!("'{}' is not a number", raw.trim()),
    })?;
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            var,
            reason: format!("{} is outside {}..={}", value, min, max),
        });
    }
    Ok(value)
}
