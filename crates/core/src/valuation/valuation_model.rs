//! Valuation output models. Derived on demand, never persisted.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockboard_market_data::CurrencyTag;

use crate::holdings::HoldingId;

/// Metrics for one holding at the time of the quote used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionMetrics {
    pub holding_id: HoldingId,
    pub symbol: String,
    /// Display currency inferred from the symbol.
    pub currency: CurrencyTag,
    /// Price used for the market value; `None` when the price is stale.
    pub price: Option<Decimal>,
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub profit: Decimal,
    /// Profit relative to cost basis, in percent.
    pub profit_percent: Decimal,
    /// True when no usable quote was available and the market value fell
    /// back to the cost basis. Distinguishes an unknown price from a flat
    /// position.
    pub price_stale: bool,
}

/// Portfolio-wide aggregate over a set of positions.
///
/// Totals add amounts of different currencies as-is when
/// `mixed_currencies` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub total_cost: Decimal,
    pub total_profit: Decimal,
    pub total_profit_percent: Decimal,
    /// Share of `total_value` per symbol, in percent (0-100).
    pub allocation_by_symbol: BTreeMap<String, Decimal>,
    pub holding_count: usize,
    pub stale_count: usize,
    pub mixed_currencies: bool,
}

impl Default for PortfolioSummary {
    fn default() -> Self {
        Self {
            total_value: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            total_profit: Decimal::ZERO,
            total_profit_percent: Decimal::ZERO,
            allocation_by_symbol: BTreeMap::new(),
            holding_count: 0,
            stale_count: 0,
            mixed_currencies: false,
        }
    }
}
