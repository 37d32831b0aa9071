//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use std::time::Duration;

use axum::http::HeaderName;
use axum::http::header::InvalidHeaderName;
use serde::Deserialize;

use crate::middleware::RateLimitConfig;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_URL` (optional): PostgreSQL connection string; enables API key verification
/// - `AUTH_TOKENS` (optional): static `token:id:email:role` entries, comma separated
/// - `RATE_LIMIT_WINDOW_MS` (optional): sliding window length, defaults to 60000
/// - `RATE_LIMIT_MAX_REQUESTS` (optional): requests admitted per window, defaults to 100
/// - `RATE_LIMIT_SWEEP_INTERVAL_MS` (optional): idle-client eviction period, defaults to 60000
/// - `FORWARDED_HEADER` (optional): client identity header, defaults to `x-forwarded-for`
/// - `TOKEN_VERIFY_TIMEOUT_MS` (optional): verification deadline, defaults to 2000
/// - `OBSERVABILITY_WEBHOOK_URL` / `OBSERVABILITY_WEBHOOK_SECRET` (optional): outcome webhook
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub server_port: u16,

    pub database_url: Option<String>,

    pub auth_tokens: Option<String>,

    #[serde(default = "default_window_ms")]
    pub rate_limit_window_ms: u64,

    #[serde(default = "default_max_requests")]
    pub rate_limit_max_requests: usize,

    #[serde(default = "default_window_ms")]
    pub rate_limit_sweep_interval_ms: u64,

    #[serde(default = "default_forwarded_header")]
    pub forwarded_header: String,

    #[serde(default = "default_verify_timeout_ms")]
    pub token_verify_timeout_ms: u64,

    pub observability_webhook_url: Option<String>,

    #[serde(default)]
    pub observability_webhook_secret: String,
}

fn default_port() -> u16 {
    3000
}

fn default_window_ms() -> u64 {
    60_000
}

fn default_max_requests() -> usize {
    100
}

fn default_forwarded_header() -> String {
    "x-forwarded-for".to_string()
}

fn default_verify_timeout_ms() -> u64 {
    2_000
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is read first if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            window: Duration::from_millis(self.rate_limit_window_ms),
            max_requests: self.rate_limit_max_requests,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_sweep_interval_ms.max(1))
    }

    pub fn token_verify_timeout(&self) -> Duration {
        Duration::from_millis(self.token_verify_timeout_ms)
    }

    /// Header names are matched lowercase.
    pub fn forwarded_header(&self) -> Result<HeaderName, InvalidHeaderName> {
        HeaderName::try_from(self.forwarded_header.trim().to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Config {
        envy::from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);

        assert_eq!(config.server_port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.rate_limit(), RateLimitConfig {
            window: Duration::from_secs(60),
            max_requests: 100,
        });
        assert_eq!(config.token_verify_timeout(), Duration::from_secs(2));
        assert_eq!(config.forwarded_header().unwrap(), "x-forwarded-for");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("SERVER_PORT", "8080"),
            ("RATE_LIMIT_WINDOW_MS", "1000"),
            ("RATE_LIMIT_MAX_REQUESTS", "10"),
            ("FORWARDED_HEADER", "X-Real-IP"),
            ("AUTH_TOKENS", "t:u:e@x.com:user"),
        ]);

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.rate_limit().max_requests, 10);
        assert_eq!(config.rate_limit().window, Duration::from_secs(1));
        assert_eq!(config.forwarded_header().unwrap(), "x-real-ip");
        assert_eq!(config.auth_tokens.as_deref(), Some("t:u:e@x.com:user"));
    }

    #[test]
    fn test_invalid_forwarded_header() {
        let config = load(&[("FORWARDED_HEADER", "bad header")]);
        assert!(config.forwarded_header().is_err());
    }
}
