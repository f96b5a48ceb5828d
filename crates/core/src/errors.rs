//! Core error types for the Stockboard engine.
//!
//! Transport-specific failures (HTTP status codes, reqwest errors) are
//! converted to these types by the API client crate.

use thiserror::Error;

use stockboard_market_data::MarketDataError;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad input for a holding mutation. Nothing was sent to the server.
    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Server-enforced plan limit. The message is the server's, verbatim.
    #[error("{0}")]
    QuotaExceeded(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Quote lookup failed; last-known quotes are kept.
    #[error("Quote provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The bearer token was rejected. Handled application-wide, not locally.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Market data operation failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Whether the error should be shown together with an upgrade hint.
    pub fn suggests_upgrade(&self) -> bool {
        matches!(self, Error::QuotaExceeded(_))
    }

    pub fn is_session_expired(&self) -> bool {
        match self {
            Error::SessionExpired => true,
            Error::MarketData(e) => e.is_session_expired(),
            _ => false,
        }
    }
}

/// Validation errors for user input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),
}
