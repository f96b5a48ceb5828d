use crate::constants::HUNDRED;
use crate::holdings::{Holding, HoldingId};
use crate::valuation::{PortfolioSummary, PositionMetrics};

use log::warn;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use stockboard_market_data::{classify_symbol_currency, Quote, QuoteMap};

/// Calculates the metrics of one holding against its latest quote.
///
/// A missing quote, or one without a positive price, falls back to the cost
/// basis: market value equals cost, profit is zero and `price_stale` is set.
///
/// # Arguments
///
/// * `holding` - The holding to value.
/// * `quote` - The latest quote for the holding's symbol, if any.
///
pub fn calculate_position(holding: &Holding, quote: Option<&Quote>) -> PositionMetrics {
    let cost_basis = holding.cost_basis();
    let currency = classify_symbol_currency(&holding.symbol);

    let priced = quote.and_then(Quote::usable_price).and_then(|price| {
        match price.checked_mul(holding.quantity) {
            Some(market_value) => Some((price, market_value)),
            None => {
                warn!(
                    "Market value of {} overflows at price {}, using cost basis",
                    holding.symbol, price
                );
                None
            }
        }
    });

    match priced {
        Some((price, market_value)) => {
            let profit = market_value.saturating_sub(cost_basis);
            PositionMetrics {
                holding_id: holding.id,
                symbol: holding.symbol.clone(),
                currency,
                price: Some(price),
                market_value,
                cost_basis,
                profit,
                profit_percent: percent_of(profit, cost_basis),
                price_stale: false,
            }
        }
        None => PositionMetrics {
            holding_id: holding.id,
            symbol: holding.symbol.clone(),
            currency,
            price: None,
            market_value: cost_basis,
            cost_basis,
            profit: Decimal::ZERO,
            profit_percent: Decimal::ZERO,
            price_stale: true,
        },
    }
}

/// Calculates metrics for every holding, looking quotes up by symbol.
pub fn calculate_positions(holdings: &[Holding], quotes: &QuoteMap) -> Vec<PositionMetrics> {
    holdings
        .iter()
        .map(|holding| calculate_position(holding, quotes.get(&holding.symbol)))
        .collect()
}

/// Aggregates position metrics into a portfolio summary.
///
/// Every position must belong to one of `holdings`. A position with an
/// unknown holding id is skipped (and asserts in debug builds).
pub fn summarize(holdings: &[Holding], positions: &[PositionMetrics]) -> PortfolioSummary {
    let known: HashMap<HoldingId, &Holding> = holdings.iter().map(|h| (h.id, h)).collect();

    let mut total_value = Decimal::ZERO;
    let mut total_cost = Decimal::ZERO;
    let mut value_by_symbol: BTreeMap<String, Decimal> = BTreeMap::new();
    let mut currencies = HashSet::new();
    let mut holding_count = 0;
    let mut stale_count = 0;

    for position in positions {
        if !known.contains_key(&position.holding_id) {
            warn!(
                "Skipping position for unknown holding {} ({})",
                position.holding_id, position.symbol
            );
            debug_assert!(
                false,
                "position for holding {} has no matching holding",
                position.holding_id
            );
            continue;
        }

        total_value = total_value.saturating_add(position.market_value);
        total_cost = total_cost.saturating_add(position.cost_basis);
        let symbol_value = value_by_symbol
            .entry(position.symbol.clone())
            .or_insert(Decimal::ZERO);
        *symbol_value = symbol_value.saturating_add(position.market_value);
        currencies.insert(position.currency);
        holding_count += 1;
        if position.price_stale {
            stale_count += 1;
        }
    }

    let total_profit = total_value.saturating_sub(total_cost);
    let allocation_by_symbol = value_by_symbol
        .into_iter()
        .map(|(symbol, value)| (symbol, percent_of(value, total_value)))
        .collect();

    PortfolioSummary {
        total_value,
        total_cost,
        total_profit,
        total_profit_percent: percent_of(total_profit, total_cost),
        allocation_by_symbol,
        holding_count,
        stale_count,
        mixed_currencies: currencies.len() > 1,
    }
}

/// `part / whole * 100`, or zero when `whole` is not positive or the
/// ratio is not representable.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    part.checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(Decimal::ZERO)
}
