use std::time::Duration;

use anyhow::{bail, Result};
use stockboard_connect::DEFAULT_API_URL;
use stockboard_core::constants::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REFRESH_INTERVAL_SECS};
use stockboard_core::EngineConfig;

pub struct Config {
    pub api_url: String,
    pub token: String,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("STOCKBOARD_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let token = match lookup("STOCKBOARD_TOKEN") {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => bail!("STOCKBOARD_TOKEN is not set. Sign in on the dashboard and copy the session token."),
        };
        let refresh_secs: u64 = lookup("STOCKBOARD_REFRESH_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);
        let timeout_ms: u64 = lookup("STOCKBOARD_FETCH_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS * 1000);
        let log_format = lookup("STOCKBOARD_LOG_FORMAT").unwrap_or_else(|| "text".to_string());

        Ok(Self {
            api_url,
            token,
            refresh_interval: Duration::from_secs(refresh_secs),
            fetch_timeout: Duration::from_millis(timeout_ms),
            log_format,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_refresh_interval(self.refresh_interval)
            .with_fetch_timeout(self.fetch_timeout)
    }
}
