use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Latest quotes keyed by the caller's holding symbol.
pub type QuoteMap = HashMap<String, Quote>;

/// Latest observed price for a symbol.
///
/// `price` is `None` when the provider knew the symbol but had no price for it.
/// Absent and zero are different states; use [`Quote::usable_price`] to get a
/// price that can value a position.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Holding symbol this quote belongs to (unqualified form)
    pub symbol: String,

    /// Last traded price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,

    /// Absolute change against the previous close
    pub change: Decimal,

    /// Percent change against the previous close
    pub change_percent: Decimal,

    /// When the quote was received
    pub fetched_at: DateTime<Utc>,

    /// Source of the quote (DASHBOARD, ...)
    pub source: String,
}

impl Quote {
    /// Create a quote with no daily change information
    pub fn new(symbol: impl Into<String>, price: Option<Decimal>, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            fetched_at: Utc::now(),
            source: source.into(),
        }
    }

    pub fn with_change(mut self, change: Decimal, change_percent: Decimal) -> Self {
        self.change = change;
        self.change_percent = change_percent;
        self
    }

    /// The price if it can be used for valuation (present and strictly positive).
    pub fn usable_price(&self) -> Option<Decimal> {
        self.price.filter(|p| *p > Decimal::ZERO)
    }

    /// Re-key the quote under a different symbol.
    pub fn for_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }
}

/// Equality ignores `fetched_at`: two fetches of unchanged provider data are equal.
impl PartialEq for Quote {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && self.price == other.price
            && self.change == other.change
            && self.change_percent == other.change_percent
            && self.source == other.source
    }
}

impl Eq for Quote {}
