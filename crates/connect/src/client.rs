//! HTTP client for the Stockboard dashboard API.
//!
//! Every request carries the session's bearer token. The backend is the
//! source of truth for holdings and the plan; this client only translates
//! its responses and status codes into engine types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;

use stockboard_core::errors::{Error, Result, ValidationError};
use stockboard_core::holdings::{Holding, HoldingId, HoldingRepositoryTrait, NewHolding};
use stockboard_core::subscription::{PlanTier, SubscriptionRepositoryTrait, SubscriptionStatus};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default base URL of a local backend.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

// ─────────────────────────────────────────────────────────────────────────────
// API Types (internal, for the backend's snake_case payloads)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, serde::Deserialize)]
struct ApiHolding {
    id: i64,
    symbol: String,
    quantity: Decimal,
    average_price: Decimal,
    #[serde(default)]
    notes: Option<String>,
}

impl From<ApiHolding> for Holding {
    fn from(item: ApiHolding) -> Self {
        Holding {
            id: HoldingId(item.id),
            symbol: item.symbol,
            quantity: item.quantity,
            average_price: item.average_price,
            notes: item.notes,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct ApiNewHolding<'a> {
    symbol: &'a str,
    quantity: Decimal,
    average_price: Decimal,
    notes: Option<&'a str>,
}

#[derive(Debug, serde::Deserialize)]
struct ApiSubscriptionStatus {
    #[serde(default)]
    tier: Option<String>,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    current_period_end: Option<String>,
}

impl From<ApiSubscriptionStatus> for SubscriptionStatus {
    fn from(status: ApiSubscriptionStatus) -> Self {
        let tier = match status.tier.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("premium") => PlanTier::Premium,
            _ => PlanTier::Free,
        };
        SubscriptionStatus {
            tier,
            is_active: status.is_active,
            current_period_end: status
                .current_period_end
                .as_deref()
                .and_then(parse_timestamp),
        }
    }
}

/// FastAPI error body: `detail` is a string, or a list of field errors for 422.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Naive ISO timestamps are UTC on the backend.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
        })
        .ok()
}

/// Extracts a readable message from an error body.
fn error_detail(body: &str) -> Option<String> {
    let detail = serde_json::from_str::<ApiErrorResponse>(body).ok()?.detail?;
    match detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .map(str::to_string)
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Maps a non-success response to an engine error.
pub(crate) fn status_error(status: StatusCode, body: &str) -> Error {
    let message = error_detail(body).unwrap_or_else(|| {
        let excerpt: String = body.chars().take(200).collect();
        if excerpt.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            excerpt
        }
    });

    match status {
        StatusCode::UNAUTHORIZED => Error::SessionExpired,
        StatusCode::NOT_FOUND => Error::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Error::Validation(ValidationError::InvalidInput(message))
        }
        _ => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn request_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network(format!("Request timed out: {}", e))
    } else {
        Error::Network(format!("Request failed: {}", e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard API Client
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for the dashboard backend.
///
/// This client provides:
/// - Holding persistence (list, create, delete)
/// - Subscription status lookups
///
/// # Example
///
/// ```ignore
/// let client = DashboardApiClient::new("http://localhost:8000/api", "your-token")?;
/// let holdings = client.list().await?;
/// ```
#[derive(Debug, Clone)]
pub struct DashboardApiClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderValue,
}

impl DashboardApiClient {
    /// Create a new dashboard API client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the API (e.g., "http://localhost:8000/api")
    /// * `access_token` - The session's bearer token
    ///
    /// # Errors
    ///
    /// Returns an error if the access token format is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(base_url: &str, access_token: &str) -> Result<Self> {
        Self::with_timeout(
            base_url,
            access_token,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(base_url: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        let auth_header = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|e| Error::Config(format!("Invalid access token format: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Unexpected(format!("Failed to initialize HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create default headers for API requests.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, self.auth_header.clone());
        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request and parse the response.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("[DashboardApi] GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(request_error)?;

        self.parse_response(response).await
    }

    /// Parse an HTTP response, handling errors appropriately.
    async fn parse_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::Unexpected(format!(
                "Failed to parse response: {} - {}",
                e,
                body.chars().take(200).collect::<String>()
            ))
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscription Endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the current user's plan.
    pub async fn get_subscription_status(&self) -> Result<SubscriptionStatus> {
        let status: ApiSubscriptionStatus = self.get("/subscription/status").await?;
        Ok(status.into())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HoldingRepositoryTrait Implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl HoldingRepositoryTrait for DashboardApiClient {
    async fn list(&self) -> Result<Vec<Holding>> {
        let items: Vec<ApiHolding> = self.get("/portfolio/").await?;
        debug!("[DashboardApi] Fetched {} holdings", items.len());
        Ok(items.into_iter().map(Holding::from).collect())
    }

    async fn create(&self, new_holding: NewHolding) -> Result<Holding> {
        let url = self.url("/portfolio/");
        debug!("[DashboardApi] POST {} ({})", url, new_holding.symbol);

        let payload = ApiNewHolding {
            symbol: &new_holding.symbol,
            quantity: new_holding.quantity,
            average_price: new_holding.average_price,
            notes: new_holding.notes.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            let message = error_detail(&body)
                .unwrap_or_else(|| "Holding limit reached for your plan".to_string());
            info!("[DashboardApi] Holding rejected by plan limit: {}", message);
            return Err(Error::QuotaExceeded(message));
        }

        let created: ApiHolding = self.parse_response(response).await?;
        Ok(created.into())
    }

    async fn delete(&self, id: HoldingId) -> Result<()> {
        let url = self.url(&format!("/portfolio/{}", id));
        debug!("[DashboardApi] DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .headers(self.headers())
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

#[async_trait]
impl SubscriptionRepositoryTrait for DashboardApiClient {
    async fn get_status(&self) -> Result<SubscriptionStatus> {
        self.get_subscription_status().await
    }
}
