//! Dashboard backend batch price provider.
//!
//! The dashboard backend exposes a single batch endpoint:
//!
//! ```text
//! GET /portfolio/prices?symbols=AAPL,005930.KS
//! {"AAPL": {"price": 201.3, "change": 1.2, "changePercent": 0.6}, ...}
//! ```
//!
//! Symbols the backend could not price are omitted from the response.
//! Every request carries the session's bearer token.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_traits::FromPrimitive;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::MarketDataError;
use crate::models::{ProviderSymbol, Quote, QuoteMap};
use crate::provider::QuoteProvider;

const PROVIDER_ID: &str = "DASHBOARD";
const PRICES_PATH: &str = "/portfolio/prices";

/// Default timeout for the HTTP client itself.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// API Response Structures
// ============================================================================

/// One entry of the /portfolio/prices response
#[derive(Debug, Deserialize)]
struct PriceEntry {
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    change: Option<f64>,
    #[serde(default, rename = "changePercent")]
    change_percent: Option<f64>,
}

/// FastAPI error body
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.filter(|v| v.is_finite()).and_then(Decimal::from_f64)
}

/// Parse a /portfolio/prices body into quotes keyed by provider symbol.
///
/// Entries that are not objects are skipped; a `null` or non-finite price
/// becomes an absent price rather than zero.
pub fn parse_prices_response(
    body: &str,
    fetched_at: DateTime<Utc>,
) -> Result<QuoteMap, MarketDataError> {
    let raw: HashMap<String, serde_json::Value> =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidResponse {
            provider: PROVIDER_ID.to_string(),
            message: format!("Failed to parse prices response: {}", e),
        })?;

    let mut quotes = QuoteMap::with_capacity(raw.len());
    for (symbol, value) in raw {
        let entry: PriceEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping malformed price entry for {}: {}", symbol, e);
                continue;
            }
        };

        let quote = Quote {
            symbol: symbol.clone(),
            price: to_decimal(entry.price),
            change: to_decimal(entry.change).unwrap_or(Decimal::ZERO),
            change_percent: to_decimal(entry.change_percent).unwrap_or(Decimal::ZERO),
            fetched_at,
            source: PROVIDER_ID.to_string(),
        };
        quotes.insert(symbol, quote);
    }

    Ok(quotes)
}

// ============================================================================
// DashboardQuoteProvider
// ============================================================================

/// Batch quote provider backed by the dashboard backend.
pub struct DashboardQuoteProvider {
    client: Client,
    base_url: String,
}

impl DashboardQuoteProvider {
    /// Create a provider for `base_url` (e.g. "http://localhost:8000/api").
    ///
    /// # Errors
    ///
    /// Returns an error if the access token is not a valid header value or
    /// the HTTP client cannot be initialized.
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, MarketDataError> {
        Self::with_timeout(
            base_url,
            access_token,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: &str,
        access_token: &str,
        timeout: Duration,
    ) -> Result<Self, MarketDataError> {
        let auth_header = HeaderValue::from_str(&format!("Bearer {}", access_token)).map_err(
            |e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Invalid access token format: {}", e),
            },
        )?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_header);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(&self, symbols: &[ProviderSymbol]) -> Result<String, MarketDataError> {
        let url = format!("{}{}", self.base_url, PRICES_PATH);
        let joined = symbols.join(",");

        debug!("Dashboard prices request: {} symbols", symbols.len());

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", joined.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MarketDataError::Timeout {
                        provider: PROVIDER_ID.to_string(),
                    }
                } else {
                    MarketDataError::Network(e)
                }
            })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(MarketDataError::Unauthorized {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if let Ok(ErrorResponse {
                detail: Some(detail),
            }) = serde_json::from_str::<ErrorResponse>(&body)
            {
                let message = match detail {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                return Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message,
                });
            }

            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!(
                    "HTTP {} - {}",
                    status,
                    body.chars().take(200).collect::<String>()
                ),
            });
        }

        response.text().await.map_err(MarketDataError::Network)
    }
}

#[async_trait]
impl QuoteProvider for DashboardQuoteProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch_batch(&self, symbols: &[ProviderSymbol]) -> Result<QuoteMap, MarketDataError> {
        if symbols.is_empty() {
            return Err(MarketDataError::NoSymbols);
        }
        let body = self.fetch(symbols).await?;
        let quotes = parse_prices_response(&body, Utc::now())?;
        debug!(
            "Dashboard prices response: {}/{} symbols resolved",
            quotes.len(),
            symbols.len()
        );
        Ok(quotes)
    }
}
