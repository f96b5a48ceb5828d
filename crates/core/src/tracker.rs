//! Portfolio tracker - the single entry point for a view.
//!
//! Wires the holding store, quote book, refresh scheduler and subscription
//! lookup together and derives valuation on demand.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use stockboard_market_data::{QuoteAdapter, QuoteProvider};
use tokio::sync::watch;

use crate::errors::Result;
use crate::holdings::{Holding, HoldingId, HoldingRepositoryTrait, HoldingStore, NewHolding};
use crate::quotes::QuoteBook;
use crate::refresh::{RefreshScheduler, RefreshStatus, SchedulerTransition, TickOutcome};
use crate::settings::EngineConfig;
use crate::subscription::{SubscriptionRepositoryTrait, SubscriptionService, SubscriptionStatus};
use crate::valuation::{calculate_positions, summarize, PortfolioSummary, PositionMetrics};

/// Everything a view renders, computed at one point in time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub holdings: Vec<Holding>,
    pub positions: Vec<PositionMetrics>,
    pub summary: PortfolioSummary,
    pub refresh: RefreshStatus,
    pub plan: SubscriptionStatus,
    pub generated_at: DateTime<Utc>,
}

pub struct PortfolioTracker {
    store: HoldingStore,
    quote_book: Arc<QuoteBook>,
    scheduler: RefreshScheduler,
    subscription: SubscriptionService,
}

impl PortfolioTracker {
    pub fn new(
        holding_repository: Arc<dyn HoldingRepositoryTrait>,
        subscription_repository: Arc<dyn SubscriptionRepositoryTrait>,
        provider: Arc<dyn QuoteProvider>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let store = HoldingStore::new(holding_repository);
        let quote_book = Arc::new(QuoteBook::new());
        let adapter = Arc::new(QuoteAdapter::with_config(provider, config.adapter_config()));
        let scheduler =
            RefreshScheduler::new(store.shared(), quote_book.clone(), adapter, &config);

        Ok(Self {
            store,
            quote_book,
            scheduler,
            subscription: SubscriptionService::new(subscription_repository),
        })
    }

    /// Loads holdings and the plan, then activates refreshing.
    ///
    /// Returns the number of holdings loaded.
    pub async fn start(&self) -> Result<usize> {
        let (loaded, plan) = futures::join!(self.store.reload(), self.subscription.status());
        let count = loaded?;
        info!(
            "Portfolio tracker started: {} holdings, {:?} plan",
            count, plan.tier
        );
        self.scheduler.on_holdings_changed();
        Ok(count)
    }

    /// Re-reads holdings from the server.
    pub async fn reload(&self) -> Result<usize> {
        let count = self.store.reload().await?;
        self.quote_book.retain_symbols(&self.store.symbols());
        self.scheduler.on_holdings_changed();
        Ok(count)
    }

    /// Adds a holding and fetches a price for it right away.
    pub async fn add_holding(&self, new_holding: NewHolding) -> Result<Holding> {
        let holding = match self.store.add(new_holding).await {
            Ok(holding) => holding,
            Err(e) => {
                if e.suggests_upgrade() {
                    self.subscription.invalidate();
                }
                return Err(e);
            }
        };

        if self.scheduler.on_holdings_changed() == SchedulerTransition::Unchanged {
            if let TickOutcome::SkippedInFlight = self.scheduler.request_refresh() {
                debug!(
                    "Refresh in flight, {} will be priced right after it",
                    holding.symbol
                );
            }
        }
        Ok(holding)
    }

    /// Removes a holding and drops its quote.
    pub async fn remove_holding(&self, id: HoldingId) -> Result<Holding> {
        let removed = self.store.remove(id).await?;
        self.quote_book.retain_symbols(&self.store.symbols());
        self.scheduler.on_holdings_changed();
        Ok(removed)
    }

    pub fn holdings(&self) -> Vec<Holding> {
        self.store.list()
    }

    pub fn positions(&self) -> Vec<PositionMetrics> {
        calculate_positions(&self.store.list(), &self.quote_book.snapshot())
    }

    pub fn summary(&self) -> PortfolioSummary {
        let holdings = self.store.list();
        let positions = calculate_positions(&holdings, &self.quote_book.snapshot());
        summarize(&holdings, &positions)
    }

    pub async fn snapshot(&self) -> PortfolioSnapshot {
        let holdings = self.store.list();
        let positions = calculate_positions(&holdings, &self.quote_book.snapshot());
        let summary = summarize(&holdings, &positions);
        PortfolioSnapshot {
            holdings,
            positions,
            summary,
            refresh: self.scheduler.status(),
            plan: self.subscription.status().await,
            generated_at: Utc::now(),
        }
    }

    pub async fn subscription_status(&self) -> SubscriptionStatus {
        self.subscription.status().await
    }

    pub fn refresh_now(&self) -> TickOutcome {
        self.scheduler.tick()
    }

    pub fn refresh_status(&self) -> RefreshStatus {
        self.scheduler.status()
    }

    /// Notified after every completed refresh cycle.
    pub fn subscribe_refreshes(&self) -> watch::Receiver<u64> {
        self.scheduler.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn shutdown(&self) {
        self.scheduler.stop();
    }
}
