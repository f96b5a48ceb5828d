//! Quote Provider Adapter.
//!
//! Normalizes a batch price lookup and absorbs provider failures:
//!
//! - de-duplicates and exchange-qualifies the requested symbols
//! - bounds every provider call with a timeout
//! - retries transient failures a bounded number of times
//! - maps provider keys back to the holding symbols
//! - never returns an error: total failure yields an empty, `Failed` batch
//!
//! Callers decide what to do with a failed batch (the quote book keeps its
//! last-known values).

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{MarketDataError, RetryBudget, RetryClass, RetryState};
use crate::models::{ProviderSymbol, QuoteMap};
use crate::provider::QuoteProvider;
use crate::resolver::SymbolResolver;

/// Default upper bound for a single provider call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of extra attempts for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default delay before the first retry.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Adapter configuration.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// Upper bound for one provider call.
    pub fetch_timeout: Duration,
    /// Extra attempts allowed for transient errors.
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each attempt.
    pub retry_backoff: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Why a batch produced no quotes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchFailure {
    /// Every attempt hit the fetch timeout.
    Timeout,
    /// The provider rejected the bearer token.
    SessionExpired,
    /// The provider answered, but resolved none of the symbols.
    EmptyResponse,
    /// Any other provider or transport failure.
    Provider(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "quote provider timed out"),
            Self::SessionExpired => write!(f, "session expired"),
            Self::EmptyResponse => write!(f, "quote provider resolved no symbols"),
            Self::Provider(message) => write!(f, "{}", message),
        }
    }
}

impl From<&MarketDataError> for FetchFailure {
    fn from(error: &MarketDataError) -> Self {
        match error {
            MarketDataError::Timeout { .. } => Self::Timeout,
            MarketDataError::Unauthorized { .. } => Self::SessionExpired,
            other => Self::Provider(other.to_string()),
        }
    }
}

/// How a batch lookup ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every requested symbol was resolved.
    Complete,
    /// Some symbols were not resolved; they are absent from the map.
    Partial { missing: Vec<String> },
    /// Nothing was resolved. The map is empty.
    Failed { reason: FetchFailure },
    /// Nothing was requested, the provider was not called.
    Skipped,
}

/// Result of [`QuoteAdapter::fetch_quotes`].
#[derive(Clone, Debug)]
pub struct QuoteBatch {
    /// Quotes keyed by the caller's symbol.
    pub quotes: QuoteMap,
    /// The de-duplicated symbols that were requested.
    pub requested: BTreeSet<String>,
    pub outcome: BatchOutcome,
}

impl QuoteBatch {
    fn skipped() -> Self {
        Self {
            quotes: QuoteMap::new(),
            requested: BTreeSet::new(),
            outcome: BatchOutcome::Skipped,
        }
    }

    fn failed(requested: BTreeSet<String>, reason: FetchFailure) -> Self {
        Self {
            quotes: QuoteMap::new(),
            requested,
            outcome: BatchOutcome::Failed { reason },
        }
    }

    /// True when the batch carries no usable data (failed or skipped).
    pub fn is_failure(&self) -> bool {
        matches!(
            self.outcome,
            BatchOutcome::Failed { .. } | BatchOutcome::Skipped
        )
    }

    pub fn failure(&self) -> Option<&FetchFailure> {
        match &self.outcome {
            BatchOutcome::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Batch lookup front-end over a [`QuoteProvider`].
pub struct QuoteAdapter {
    provider: Arc<dyn QuoteProvider>,
    resolver: SymbolResolver,
    config: AdapterConfig,
}

impl QuoteAdapter {
    pub fn new(provider: Arc<dyn QuoteProvider>) -> Self {
        Self::with_config(provider, AdapterConfig::default())
    }

    pub fn with_config(provider: Arc<dyn QuoteProvider>, config: AdapterConfig) -> Self {
        Self {
            provider,
            resolver: SymbolResolver::new(),
            config,
        }
    }

    pub fn with_resolver(mut self, resolver: SymbolResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Fetch the latest quotes for a set of holding symbols.
    ///
    /// The result is keyed by the caller's symbols (trimmed). A symbol the
    /// provider did not resolve is absent from the map.
    pub async fn fetch_quotes<I, S>(&self, symbols: I) -> QuoteBatch
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: BTreeSet<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if requested.is_empty() {
            debug!("Quote fetch skipped: no symbols requested");
            return QuoteBatch::skipped();
        }

        // provider symbol -> holding symbols that qualify to it
        let mut routes: HashMap<ProviderSymbol, Vec<String>> = HashMap::new();
        for symbol in &requested {
            routes
                .entry(self.resolver.qualify(symbol))
                .or_default()
                .push(symbol.clone());
        }
        let mut provider_symbols: Vec<ProviderSymbol> = routes.keys().cloned().collect();
        provider_symbols.sort();

        let raw = match self.fetch_with_retry(&provider_symbols).await {
            Ok(raw) => raw,
            Err(reason) => return QuoteBatch::failed(requested, reason),
        };

        let mut quotes = QuoteMap::with_capacity(requested.len());
        for (provider_symbol, holders) in &routes {
            // Some backends echo the bare code instead of the qualified symbol.
            let found = raw
                .get(provider_symbol)
                .or_else(|| holders.iter().find_map(|h| raw.get(h)));
            if let Some(quote) = found {
                for holder in holders {
                    quotes.insert(holder.clone(), quote.clone().for_symbol(holder.clone()));
                }
            }
        }

        if quotes.is_empty() {
            warn!(
                "Quote provider {} resolved none of {} symbols",
                self.provider.id(),
                requested.len()
            );
            return QuoteBatch::failed(requested, FetchFailure::EmptyResponse);
        }

        let missing: Vec<String> = requested
            .iter()
            .filter(|s| !quotes.contains_key(*s))
            .cloned()
            .collect();

        let outcome = if missing.is_empty() {
            BatchOutcome::Complete
        } else {
            debug!("Unresolved symbols: {:?}", missing);
            BatchOutcome::Partial { missing }
        };

        QuoteBatch {
            quotes,
            requested,
            outcome,
        }
    }

    async fn fetch_with_retry(
        &self,
        provider_symbols: &[ProviderSymbol],
    ) -> Result<QuoteMap, FetchFailure> {
        let mut budget = RetryBudget::new(self.config.max_retries, self.config.retry_backoff);
        let mut last_failure = FetchFailure::Provider("no attempt made".to_string());

        while let RetryState::Ready { attempt } = budget.next_attempt() {
            let result = tokio::time::timeout(
                self.config.fetch_timeout,
                self.provider.fetch_batch(provider_symbols),
            )
            .await
            .unwrap_or_else(|_| {
                Err(MarketDataError::Timeout {
                    provider: self.provider.id().to_string(),
                })
            });

            match result {
                Ok(raw) => return Ok(raw),
                Err(error) => {
                    last_failure = FetchFailure::from(&error);
                    let retryable = error.retry_class() == RetryClass::WithBackoff;
                    if retryable && budget.has_remaining() {
                        let delay = budget.backoff();
                        info!(
                            "Quote fetch attempt {} failed ({}), retrying in {:?}",
                            attempt, error, delay
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    warn!("Quote fetch failed after {} attempt(s): {}", attempt, error);
                    break;
                }
            }
        }

        Err(last_failure)
    }
}
