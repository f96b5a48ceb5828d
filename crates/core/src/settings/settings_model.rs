//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stockboard_market_data::AdapterConfig;

use crate::constants::{
    DEFAULT_FETCH_RETRIES, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_REFRESH_INTERVAL_SECS,
    DEFAULT_RETRY_BACKOFF_MS,
};
use crate::errors::{Error, Result};

/// Tunables for the refresh loop and the quote adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Period between refresh cycles.
    pub refresh_interval: Duration,
    /// Upper bound for a single quote lookup.
    pub fetch_timeout: Duration,
    /// Extra attempts after a transient quote failure.
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_retries: DEFAULT_FETCH_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl EngineConfig {
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval.is_zero() {
            return Err(Error::Config(
                "Refresh interval must be greater than zero".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(Error::Config(
                "Fetch timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings handed to the quote adapter.
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            fetch_timeout: self.fetch_timeout,
            max_retries: self.max_retries,
            retry_backoff: self.retry_backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = EngineConfig::default().with_refresh_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_adapter_config_mirrors_engine_config() {
        let config = EngineConfig::default()
            .with_fetch_timeout(Duration::from_secs(5))
            .with_max_retries(3);
        let adapter = config.adapter_config();
        assert_eq!(adapter.fetch_timeout, Duration::from_secs(5));
        assert_eq!(adapter.max_retries, 3);
        assert_eq!(adapter.retry_backoff, config.retry_backoff);
    }
}
