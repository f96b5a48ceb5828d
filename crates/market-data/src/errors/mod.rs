//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all quote fetching operations
//! - [`RetryClass`]: Classification for determining retry behavior
//! - [`RetryBudget`]: Bounded retry counter with an explicit terminal state

mod retry;

pub use retry::{RetryBudget, RetryClass, RetryState};

use thiserror::Error;

/// Errors that can occur while fetching quotes.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines whether the adapter may spend another attempt on it.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The request contained no usable symbols.
    #[error("No symbols requested")]
    NoSymbols,

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider did not complete within the fetch timeout.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The bearer token was rejected (HTTP 401).
    /// Session handling belongs to the surrounding application.
    #[error("Session expired: {provider}")]
    Unauthorized {
        /// The provider that rejected the token
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider answered with a body we could not understand.
    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        /// The provider that sent the body
        provider: String,
        /// Parse failure details
        message: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Never`]: Don't retry, the error is terminal for this cycle
    /// - [`RetryClass::WithBackoff`]: Transient, another attempt may succeed
    ///
    /// # Examples
    ///
    /// ```
    /// use stockboard_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "DASHBOARD".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::Unauthorized { provider: "DASHBOARD".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } => RetryClass::WithBackoff,
            Self::Network(e) if e.is_timeout() || e.is_connect() => RetryClass::WithBackoff,
            Self::NoSymbols
            | Self::Unauthorized { .. }
            | Self::ProviderError { .. }
            | Self::InvalidResponse { .. }
            | Self::Network(_) => RetryClass::Never,
        }
    }

    /// Whether this error means the bearer token is no longer valid.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_retries_with_backoff() {
        let error = MarketDataError::RateLimited {
            provider: "DASHBOARD".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_timeout_retries_with_backoff() {
        let error = MarketDataError::Timeout {
            provider: "DASHBOARD".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    }

    #[test]
    fn test_unauthorized_never_retries() {
        let error = MarketDataError::Unauthorized {
            provider: "DASHBOARD".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
        assert!(error.is_session_expired());
    }

    #[test]
    fn test_provider_error_never_retries() {
        let error = MarketDataError::ProviderError {
            provider: "DASHBOARD".to_string(),
            message: "Internal server error".to_string(),
        };
        assert_eq!(error.retry_class(), RetryClass::Never);
        assert!(!error.is_session_expired());
    }

    #[test]
    fn test_error_display() {
        let error = MarketDataError::RateLimited {
            provider: "DASHBOARD".to_string(),
        };
        assert_eq!(format!("{}", error), "Rate limited: DASHBOARD");

        let error = MarketDataError::ProviderError {
            provider: "DASHBOARD".to_string(),
            message: "HTTP 500".to_string(),
        };
        assert_eq!(format!("{}", error), "Provider error: DASHBOARD - HTTP 500");
    }
}
