//! Exchange qualification for holding symbols.
//!
//! Users enter domestic (Korea Exchange) issues by their bare six-digit code,
//! e.g. `005930`. The quote endpoint expects the exchange-qualified form,
//! `005930.KS`. Foreign tickers (`AAPL`, `BRK.B`) are sent unchanged.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::models::{Currency, ProviderSymbol};

/// Suffix appended to bare domestic codes (KOSPI).
pub const DOMESTIC_EXCHANGE_SUFFIX: &str = ".KS";

/// Domestic exchange suffixes recognised when stripping.
const DOMESTIC_EXCHANGE_SUFFIXES: &[&str] = &[".KS", ".KQ"];

/// Display currency inferred from the shape of a symbol.
///
/// Presentation only. Valuation never converts between these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyTag {
    /// Korea Exchange listing, priced in KRW
    Domestic,
    /// Everything else, priced in USD
    Foreign,
}

impl CurrencyTag {
    pub fn currency(&self) -> Currency {
        match self {
            Self::Domestic => Cow::Borrowed("KRW"),
            Self::Foreign => Cow::Borrowed("USD"),
        }
    }
}

fn is_domestic_code(code: &str) -> bool {
    !code.is_empty() && code.chars().all(|c| c.is_ascii_digit())
}

/// Strip a known domestic exchange suffix (`.KS`, `.KQ`).
///
/// Uses a whitelist so share classes like `BRK.B` are preserved.
pub fn strip_exchange_suffix(symbol: &str) -> &str {
    for suffix in DOMESTIC_EXCHANGE_SUFFIXES {
        if let Some(stripped) = symbol.strip_suffix(suffix) {
            if is_domestic_code(stripped) {
                return stripped;
            }
        }
    }
    symbol
}

/// Classify a holding symbol as domestic or foreign by its shape.
pub fn classify_symbol_currency(symbol: &str) -> CurrencyTag {
    if is_domestic_code(strip_exchange_suffix(symbol.trim())) {
        CurrencyTag::Domestic
    } else {
        CurrencyTag::Foreign
    }
}

/// Converts holding symbols into the form the quote endpoint expects.
#[derive(Clone, Debug)]
pub struct SymbolResolver {
    domestic_suffix: Cow<'static, str>,
}

impl Default for SymbolResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolResolver {
    pub fn new() -> Self {
        Self {
            domestic_suffix: Cow::Borrowed(DOMESTIC_EXCHANGE_SUFFIX),
        }
    }

    /// Use a different suffix for bare domestic codes (e.g. ".KQ" for KOSDAQ-only books).
    pub fn with_domestic_suffix(suffix: impl Into<Cow<'static, str>>) -> Self {
        Self {
            domestic_suffix: suffix.into(),
        }
    }

    /// Exchange-qualify a holding symbol.
    pub fn qualify(&self, symbol: &str) -> ProviderSymbol {
        let symbol = symbol.trim();
        if is_domestic_code(symbol) {
            format!("{}{}", symbol, self.domestic_suffix)
        } else {
            symbol.to_string()
        }
    }
}
