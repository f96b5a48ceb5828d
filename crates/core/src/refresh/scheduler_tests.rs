use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockboard_market_data::{
    FetchFailure, MarketDataError, ProviderSymbol, Quote, QuoteAdapter, QuoteMap, QuoteProvider,
};
use tokio::sync::Notify;

use crate::holdings::{Holding, HoldingId, SharedHoldings};
use crate::quotes::QuoteBook;
use crate::refresh::{CycleReport, RefreshScheduler, SchedulerTransition, TickOutcome};
use crate::settings::EngineConfig;

/// Provider with a fixed price table and switchable failure modes.
struct ScriptedProvider {
    prices: HashMap<String, Decimal>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    failing: AtomicBool,
    unauthorized: AtomicBool,
}

impl ScriptedProvider {
    fn new(prices: &[(&str, Decimal)]) -> Self {
        Self {
            prices: prices.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            calls: AtomicUsize::new(0),
            delay: None,
            gate: None,
            failing: AtomicBool::new(false),
            unauthorized: AtomicBool::new(false),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Responses are held until `release()` is called.
    fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Notify::new()));
        self
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuoteProvider for ScriptedProvider {
    fn id(&self) -> &'static str {
        "SCRIPTED"
    }

    async fn fetch_batch(&self, symbols: &[ProviderSymbol]) -> Result<QuoteMap, MarketDataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.unauthorized.load(Ordering::SeqCst) {
            return Err(MarketDataError::Unauthorized {
                provider: "SCRIPTED".to_string(),
            });
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(MarketDataError::ProviderError {
                provider: "SCRIPTED".to_string(),
                message: "HTTP 502".to_string(),
            });
        }
        Ok(symbols
            .iter()
            .filter_map(|s| {
                self.prices
                    .get(s)
                    .map(|p| (s.clone(), Quote::new(s.clone(), Some(*p), "SCRIPTED")))
            })
            .collect())
    }
}

fn holding(id: i64, symbol: &str) -> Holding {
    Holding {
        id: HoldingId(id),
        symbol: symbol.to_string(),
        quantity: dec!(1),
        average_price: dec!(100),
        notes: None,
    }
}

struct Fixture {
    scheduler: RefreshScheduler,
    holdings: SharedHoldings,
    book: Arc<QuoteBook>,
}

fn fixture(provider: Arc<ScriptedProvider>, held: Vec<Holding>, period_secs: u64) -> Fixture {
    let config = EngineConfig::default()
        .with_refresh_interval(Duration::from_secs(period_secs))
        .with_fetch_timeout(Duration::from_secs(600))
        .with_max_retries(0);
    let holdings = SharedHoldings::new(held);
    let book = Arc::new(QuoteBook::new());
    let adapter = Arc::new(QuoteAdapter::with_config(provider, config.adapter_config()));
    let scheduler = RefreshScheduler::new(holdings.clone(), book.clone(), adapter, &config);
    Fixture {
        scheduler,
        holdings,
        book,
    }
}

async fn wait_for_calls(provider: &ScriptedProvider, calls: usize) {
    while provider.calls() < calls {
        tokio::task::yield_now().await;
    }
}

async fn run_tick(scheduler: &RefreshScheduler) -> CycleReport {
    match scheduler.tick() {
        TickOutcome::Started(handle) => handle.await.unwrap(),
        other => panic!("expected a started cycle, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_fetch_drops_overlapping_ticks() {
    let provider = Arc::new(
        ScriptedProvider::new(&[("AAPL", dec!(200))]).with_delay(Duration::from_secs(150)),
    );
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);

    assert_eq!(
        f.scheduler.on_holdings_changed(),
        SchedulerTransition::Activated
    );

    // Ticks at 60s and 120s fire while the first lookup is still running.
    tokio::time::sleep(Duration::from_secs(140)).await;
    assert_eq!(provider.calls(), 1);
    assert!(f.scheduler.is_fetching());
    assert_eq!(f.scheduler.status().ticks_skipped, 2);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(!f.scheduler.is_fetching());
    assert_eq!(f.book.get("AAPL").unwrap().price, Some(dec!(200)));

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(provider.calls(), 2);
    assert_eq!(f.scheduler.status().cycles_started, 2);
}

#[tokio::test]
async fn test_manual_tick_while_in_flight_is_skipped() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAPL", dec!(200))]).gated());
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);

    let TickOutcome::Started(handle) = f.scheduler.tick() else {
        panic!("first tick should start a cycle");
    };
    wait_for_calls(&provider, 1).await;

    assert!(matches!(f.scheduler.tick(), TickOutcome::SkippedInFlight));

    provider.release();
    handle.await.unwrap();
    assert_eq!(provider.calls(), 1);
    assert!(f.scheduler.tick().is_started());
}

#[tokio::test]
async fn test_quote_for_holding_removed_mid_flight_is_discarded() {
    let provider = Arc::new(
        ScriptedProvider::new(&[("AAPL", dec!(200)), ("MSFT", dec!(400))]).gated(),
    );
    let f = fixture(
        provider.clone(),
        vec![holding(1, "AAPL"), holding(2, "MSFT")],
        60,
    );

    let TickOutcome::Started(handle) = f.scheduler.tick() else {
        panic!("tick should start a cycle");
    };
    wait_for_calls(&provider, 1).await;

    // Removal lands while the lookup for {AAPL, MSFT} is pending.
    f.holdings.remove(HoldingId(2));
    f.book.retain_symbols(&f.holdings.symbols());
    provider.release();

    let CycleReport::Applied { report, .. } = handle.await.unwrap() else {
        panic!("cycle should apply quotes");
    };
    assert_eq!(report.applied, 1);
    assert_eq!(report.discarded, 1);
    assert!(f.book.get("MSFT").is_none());
    assert!(f.book.get("AAPL").is_some());
}

#[tokio::test]
async fn test_failure_keeps_last_known_quotes() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAPL", dec!(200))]));
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);
    run_tick(&f.scheduler).await;

    provider.set_failing(true);
    let report = run_tick(&f.scheduler).await;

    assert!(matches!(report, CycleReport::Failed { .. }));
    assert!(matches!(
        report.error(),
        Some(crate::Error::ProviderUnavailable(_))
    ));
    assert_eq!(f.book.get("AAPL").unwrap().price, Some(dec!(200)));
    let status = f.scheduler.status();
    assert_eq!(status.consecutive_failures, 1);
    assert!(status.last_error.is_some());
    assert!(status.last_success.is_some());

    provider.set_failing(false);
    run_tick(&f.scheduler).await;
    assert_eq!(f.scheduler.status().consecutive_failures, 0);
    assert!(f.scheduler.status().last_error.is_none());
}

#[tokio::test]
async fn test_unauthorized_marks_session_expired() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAPL", dec!(200))]));
    provider.unauthorized.store(true, Ordering::SeqCst);
    let f = fixture(provider, vec![holding(1, "AAPL")], 60);

    let report = run_tick(&f.scheduler).await;

    assert_eq!(
        report,
        CycleReport::Failed {
            reason: FetchFailure::SessionExpired
        }
    );
    assert!(report.error().unwrap().is_session_expired());
    assert!(f.scheduler.status().session_expired);
}

#[tokio::test]
async fn test_stop_ignores_in_flight_result() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAPL", dec!(200))]).gated());
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);

    let TickOutcome::Started(handle) = f.scheduler.tick() else {
        panic!("tick should start a cycle");
    };
    wait_for_calls(&provider, 1).await;

    f.scheduler.stop();
    provider.release();

    assert_eq!(handle.await.unwrap(), CycleReport::Superseded);
    assert!(f.book.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_holding_set_deactivates() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAPL", dec!(200))]));
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);

    f.scheduler.on_holdings_changed();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(f.scheduler.is_active());

    f.holdings.remove(HoldingId(1));
    assert_eq!(
        f.scheduler.on_holdings_changed(),
        SchedulerTransition::Deactivated
    );
    assert!(!f.scheduler.is_active());

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_no_holdings_is_idle() {
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let f = fixture(provider.clone(), Vec::new(), 60);

    assert!(matches!(f.scheduler.tick(), TickOutcome::Idle));
    assert_eq!(
        f.scheduler.on_holdings_changed(),
        SchedulerTransition::Unchanged
    );
    assert!(!f.scheduler.is_active());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_timer_reads_live_holding_set() {
    let provider = Arc::new(ScriptedProvider::new(&[
        ("AAPL", dec!(200)),
        ("MSFT", dec!(400)),
    ]));
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);
    f.scheduler.on_holdings_changed();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(f.book.get("MSFT").is_none());

    f.holdings.upsert(holding(2, "MSFT"));
    assert_eq!(
        f.scheduler.on_holdings_changed(),
        SchedulerTransition::Unchanged
    );

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(f.book.get("MSFT").unwrap().price, Some(dec!(400)));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_scheduler_clears_timer() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAPL", dec!(200))]));
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);
    f.scheduler.on_holdings_changed();
    tokio::time::sleep(Duration::from_secs(1)).await;

    drop(f);
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_subscribers_see_completed_cycles() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAPL", dec!(200))]));
    let f = fixture(provider, vec![holding(1, "AAPL")], 60);
    let mut completed = f.scheduler.subscribe();

    run_tick(&f.scheduler).await;

    assert!(completed.has_changed().unwrap());
    assert_eq!(*completed.borrow_and_update(), 1);
}

async fn wait_for_quote(book: &QuoteBook, symbol: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while book.get(symbol).is_none() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{} was never priced", symbol));
}

#[tokio::test]
async fn test_refresh_requested_mid_flight_runs_right_after() {
    let provider = Arc::new(
        ScriptedProvider::new(&[("AAPL", dec!(200)), ("MSFT", dec!(400))]).gated(),
    );
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);

    let TickOutcome::Started(handle) = f.scheduler.tick() else {
        panic!("tick should start a cycle");
    };
    wait_for_calls(&provider, 1).await;

    f.holdings.upsert(holding(2, "MSFT"));
    assert!(matches!(
        f.scheduler.request_refresh(),
        TickOutcome::SkippedInFlight
    ));

    provider.release();
    handle.await.unwrap();
    assert!(f.book.get("MSFT").is_none());

    wait_for_calls(&provider, 2).await;
    provider.release();
    wait_for_quote(&f.book, "MSFT").await;
    assert_eq!(f.scheduler.status().cycles_started, 2);
}

#[tokio::test]
async fn test_reactivation_runs_after_abandoned_cycle() {
    let provider = Arc::new(
        ScriptedProvider::new(&[("AAPL", dec!(200)), ("MSFT", dec!(400))]).gated(),
    );
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);

    assert_eq!(
        f.scheduler.on_holdings_changed(),
        SchedulerTransition::Activated
    );
    wait_for_calls(&provider, 1).await;

    // Last holding removed, then a new one added, while the first lookup
    // is still pending.
    f.holdings.remove(HoldingId(1));
    assert_eq!(
        f.scheduler.on_holdings_changed(),
        SchedulerTransition::Deactivated
    );
    f.holdings.upsert(holding(2, "MSFT"));
    assert_eq!(
        f.scheduler.on_holdings_changed(),
        SchedulerTransition::Activated
    );
    while f.scheduler.status().ticks_skipped < 1 {
        tokio::task::yield_now().await;
    }

    provider.release();
    wait_for_calls(&provider, 2).await;
    provider.release();
    wait_for_quote(&f.book, "MSFT").await;

    assert!(f.book.get("AAPL").is_none());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_stop_drops_queued_refresh() {
    let provider = Arc::new(ScriptedProvider::new(&[("AAPL", dec!(200))]).gated());
    let f = fixture(provider.clone(), vec![holding(1, "AAPL")], 60);

    let TickOutcome::Started(handle) = f.scheduler.tick() else {
        panic!("tick should start a cycle");
    };
    wait_for_calls(&provider, 1).await;
    f.scheduler.request_refresh();

    f.scheduler.stop();
    provider.release();
    assert_eq!(handle.await.unwrap(), CycleReport::Superseded);

    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(provider.calls(), 1);
}
