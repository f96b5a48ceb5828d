//! Market data models
//!
//! - `types` - Type aliases for common identifiers (ProviderId, Currency, ProviderSymbol)
//! - `quote` - Quote data structures (Quote, QuoteMap)

mod quote;
mod types;

pub use quote::{Quote, QuoteMap};
pub use types::{Currency, ProviderId, ProviderSymbol};
