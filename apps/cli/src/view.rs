//! Plain-text rendering of engine output.

use rust_decimal::Decimal;
use stockboard_core::constants::{DISPLAY_DECIMAL_PRECISION, FREE_HOLDING_LIMIT, UPGRADE_HINT};
use stockboard_core::subscription::SubscriptionStatus;
use stockboard_core::{Holding, PortfolioSnapshot, PortfolioSummary, PositionMetrics};
use stockboard_market_data::CurrencyTag;

fn money(value: Decimal, currency: &CurrencyTag) -> String {
    match currency {
        CurrencyTag::Domestic => format!("{} {}", value.round_dp(0), currency.currency()),
        CurrencyTag::Foreign => format!(
            "{} {}",
            value.round_dp(DISPLAY_DECIMAL_PRECISION),
            currency.currency()
        ),
    }
}

fn percent(value: Decimal) -> String {
    format!("{}%", value.round_dp(DISPLAY_DECIMAL_PRECISION))
}

pub fn position_line(position: &PositionMetrics) -> String {
    let price = match position.price {
        Some(price) => money(price, &position.currency),
        None => "n/a".to_string(),
    };
    let mut line = format!(
        "{:<12} price {:>16}  value {:>18}  P/L {:>16} ({})",
        position.symbol,
        price,
        money(position.market_value, &position.currency),
        money(position.profit, &position.currency),
        percent(position.profit_percent),
    );
    if position.price_stale {
        line.push_str("  [stale]");
    }
    line
}

pub fn summary_line(summary: &PortfolioSummary) -> String {
    let mut line = format!(
        "{} holdings  value {}  cost {}  P/L {} ({})",
        summary.holding_count,
        summary.total_value.round_dp(DISPLAY_DECIMAL_PRECISION),
        summary.total_cost.round_dp(DISPLAY_DECIMAL_PRECISION),
        summary.total_profit.round_dp(DISPLAY_DECIMAL_PRECISION),
        percent(summary.total_profit_percent),
    );
    if summary.stale_count > 0 {
        line.push_str(&format!("  {} without price", summary.stale_count));
    }
    if summary.mixed_currencies {
        line.push_str("  [mixed KRW/USD]");
    }
    line
}

pub fn plan_line(status: &SubscriptionStatus, held: usize) -> String {
    if status.is_premium() {
        let mut line = format!("Premium plan, {} holdings tracked", held);
        if let Some(end) = status.current_period_end {
            line.push_str(&format!(" (renews {})", end.format("%Y-%m-%d")));
        }
        return line;
    }
    let mut line = format!(
        "Free plan, {} of {} holdings used",
        held, FREE_HOLDING_LIMIT
    );
    if held >= FREE_HOLDING_LIMIT {
        line.push_str(". ");
        line.push_str(UPGRADE_HINT);
    }
    line
}

pub fn print_holdings(holdings: &[Holding]) {
    if holdings.is_empty() {
        println!("No holdings yet.");
        return;
    }
    for holding in holdings {
        let notes = holding.notes.as_deref().unwrap_or("");
        println!(
            "#{:<6} {:<12} qty {:>12}  avg {:>14}  {}",
            holding.id.to_string(),
            holding.symbol,
            holding.quantity,
            holding.average_price,
            notes
        );
    }
}

pub fn print_snapshot(snapshot: &PortfolioSnapshot) {
    for position in &snapshot.positions {
        println!("{}", position_line(position));
    }
    println!("{}", summary_line(&snapshot.summary));
}
