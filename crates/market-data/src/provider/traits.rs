//! Quote provider trait definition.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{ProviderSymbol, QuoteMap};

/// Trait for batch quote providers.
///
/// Implement this trait to add a new price source. Providers receive
/// symbols that are already de-duplicated and exchange-qualified; the
/// adapter owns normalization, timeouts and retries.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use stockboard_market_data::provider::QuoteProvider;
///
/// struct FixedProvider;
///
/// #[async_trait]
/// impl QuoteProvider for FixedProvider {
///     fn id(&self) -> &'static str {
///         "FIXED"
///     }
///
///     async fn fetch_batch(&self, symbols: &[ProviderSymbol]) -> Result<QuoteMap, MarketDataError> {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Used for logging and as the `source` of returned quotes.
    fn id(&self) -> &'static str;

    /// Fetch the latest quotes for a batch of symbols.
    ///
    /// The returned map is keyed by the provider symbol. Symbols the provider
    /// could not resolve are omitted rather than reported as errors.
    async fn fetch_batch(&self, symbols: &[ProviderSymbol]) -> Result<QuoteMap, MarketDataError>;
}
