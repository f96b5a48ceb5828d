//! Stockboard Market Data Crate
//!
//! Batch price lookup for the portfolio dashboard.
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! | holding symbols  |  (as the user typed them)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  SymbolResolver  |  (005930 -> 005930.KS)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  QuoteAdapter    |  (dedupe, timeout, bounded retry, key mapping)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  QuoteProvider   |  (dashboard /portfolio/prices)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |   QuoteBatch     |  (quotes keyed by holding symbol + outcome)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Quote`] - Latest price for one symbol
//! - [`QuoteAdapter`] - Fail-closed batch lookup
//! - [`QuoteBatch`] / [`BatchOutcome`] - Result of one lookup
//! - [`CurrencyTag`] - Domestic / foreign display classification

pub mod adapter;
pub mod errors;
pub mod models;
pub mod provider;
pub mod resolver;

pub use adapter::{AdapterConfig, BatchOutcome, FetchFailure, QuoteAdapter, QuoteBatch};

pub use errors::{MarketDataError, RetryBudget, RetryClass, RetryState};

pub use models::{Currency, ProviderId, ProviderSymbol, Quote, QuoteMap};

pub use resolver::{
    classify_symbol_currency, strip_exchange_suffix, CurrencyTag, SymbolResolver,
    DOMESTIC_EXCHANGE_SUFFIX,
};

pub use provider::dashboard::DashboardQuoteProvider;
pub use provider::QuoteProvider;
