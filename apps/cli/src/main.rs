use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use stockboard_connect::DashboardApiClient;
use stockboard_core::constants::UPGRADE_HINT;
use stockboard_core::{
    Error, HoldingId, HoldingStore, NewHolding, PortfolioSnapshot, PortfolioTracker,
};
use stockboard_market_data::DashboardQuoteProvider;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod view;

use config::Config;

/// Track stock holdings against live prices.
#[derive(Parser, Debug)]
#[command(name = "stockboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Refresh prices periodically and print the portfolio after each cycle (default)
    Watch {
        /// Print each snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved holdings
    List,
    /// Add a holding
    Add {
        symbol: String,
        quantity: Decimal,
        average_price: Decimal,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Remove a holding by id
    Remove { id: i64 },
    /// Show the current plan
    Plan,
}

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Turns an expired session into the message the user can act on.
fn explain(err: Error) -> anyhow::Error {
    if err.is_session_expired() {
        return anyhow::anyhow!("Session expired. Sign in again and update STOCKBOARD_TOKEN.");
    }
    if err.suggests_upgrade() {
        return anyhow::anyhow!("{} {}", err, UPGRADE_HINT);
    }
    err.into()
}

async fn watch(config: &Config, client: Arc<DashboardApiClient>, json: bool) -> Result<()> {
    let provider = Arc::new(DashboardQuoteProvider::with_timeout(
        &config.api_url,
        &config.token,
        config.fetch_timeout,
    )?);
    let tracker = PortfolioTracker::new(
        client.clone(),
        client,
        provider,
        config.engine_config(),
    )?;

    let count = tracker.start().await.map_err(explain)?;
    if count == 0 {
        warn!("No holdings to track. Add one with `stockboard add`.");
        return Ok(());
    }

    watch_refreshes(&tracker, json, tokio::signal::ctrl_c()).await
}

fn render(snapshot: &PortfolioSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        view::print_snapshot(snapshot);
    }
    info!("{}", view::summary_line(&snapshot.summary));
    Ok(())
}

/// Prints a snapshot after every completed refresh cycle until `shutdown`
/// resolves or the session expires. Stops the tracker either way.
async fn watch_refreshes<F>(tracker: &PortfolioTracker, json: bool, shutdown: F) -> Result<()>
where
    F: Future,
{
    let mut refreshes = tracker.subscribe_refreshes();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            changed = refreshes.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let status = tracker.refresh_status();
                if status.session_expired {
                    break Err(explain(Error::SessionExpired));
                }
                if let Some(last_error) = &status.last_error {
                    warn!(
                        "Refresh failed ({} in a row), showing last known prices: {}",
                        status.consecutive_failures, last_error
                    );
                }
                if let Err(e) = render(&tracker.snapshot().await, json) {
                    break Err(e);
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break Ok(());
            }
        }
    };

    tracker.shutdown();
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.log_format);

    let client = Arc::new(DashboardApiClient::with_timeout(
        &config.api_url,
        &config.token,
        config.fetch_timeout,
    )?);

    let command = cli.command.unwrap_or(Commands::Watch { json: false });
    let result = match command {
        Commands::Watch { json } => watch(&config, client, json).await,
        Commands::List => {
            let store = HoldingStore::new(client);
            store.reload().await.map_err(explain)?;
            view::print_holdings(&store.list());
            Ok(())
        }
        Commands::Add {
            symbol,
            quantity,
            average_price,
            notes,
        } => {
            let mut new_holding = NewHolding::new(symbol, quantity, average_price);
            if let Some(notes) = notes {
                new_holding = new_holding.with_notes(notes);
            }
            let store = HoldingStore::new(client);
            let holding = store.add(new_holding).await.map_err(explain)?;
            info!("Added {} as #{}", holding.symbol, holding.id);
            Ok(())
        }
        Commands::Remove { id } => {
            let store = HoldingStore::new(client);
            store.reload().await.map_err(explain)?;
            let removed = store.remove(HoldingId(id)).await.map_err(explain)?;
            info!("Removed #{} ({})", removed.id, removed.symbol);
            Ok(())
        }
        Commands::Plan => {
            let status = client.get_subscription_status().await.map_err(explain)?;
            let store = HoldingStore::new(client);
            let held = store.reload().await.map_err(explain)?;
            println!("{}", view::plan_line(&status, held));
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
