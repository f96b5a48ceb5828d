//! Periodic quote refresh.
//!
//! One timer task per active scheduler. Each tick spawns a refresh cycle so
//! the timer is never blocked by a slow lookup; at most one cycle is in
//! flight at a time and timer ticks firing meanwhile are dropped. A holding
//! change that hits an in-flight cycle queues a single follow-up cycle.
//!
//! Every cycle reads the symbol set from [`SharedHoldings`] when it starts,
//! and merges the result against the set held when the response arrives.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use stockboard_market_data::{BatchOutcome, FetchFailure, QuoteAdapter};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::refresh_model::{CycleReport, RefreshStatus, SchedulerTransition, TickOutcome};
use crate::holdings::SharedHoldings;
use crate::quotes::QuoteBook;
use crate::settings::EngineConfig;

/// RAII marker for the single in-flight refresh cycle.
struct InFlightGuard {
    shared: Arc<SchedulerShared>,
}

impl InFlightGuard {
    /// Returns `None` if a cycle is already in flight.
    fn try_acquire(shared: &Arc<SchedulerShared>) -> Option<Self> {
        shared
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                shared: Arc::clone(shared),
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.shared.in_flight.store(false, Ordering::SeqCst);
    }
}

struct SchedulerShared {
    holdings: SharedHoldings,
    quote_book: Arc<QuoteBook>,
    adapter: Arc<QuoteAdapter>,
    period: Duration,
    in_flight: AtomicBool,
    /// One cycle owed to a holding change that arrived mid-flight.
    follow_up: AtomicBool,
    /// Bumped on teardown; cycles started under an older value are ignored.
    generation: AtomicU64,
    status: RwLock<RefreshStatus>,
    completed: watch::Sender<u64>,
}

impl SchedulerShared {
    fn update_status(&self, update: impl FnOnce(&mut RefreshStatus)) {
        let mut status = self.status.write().unwrap_or_else(|poisoned| {
            warn!("Refresh status lock was poisoned, recovering");
            poisoned.into_inner()
        });
        update(&mut status);
    }

    fn tick(self: &Arc<Self>) -> TickOutcome {
        if self.holdings.is_empty() {
            return TickOutcome::Idle;
        }

        let Some(guard) = InFlightGuard::try_acquire(self) else {
            debug!("Refresh tick skipped: previous cycle still in flight");
            self.update_status(|s| s.ticks_skipped += 1);
            return TickOutcome::SkippedInFlight;
        };

        let generation = self.generation.load(Ordering::Acquire);
        self.update_status(|s| s.cycles_started += 1);

        let shared = Arc::clone(self);
        TickOutcome::Started(tokio::spawn(async move {
            let report = {
                let _guard = guard;
                shared.run_cycle(generation).await
            };
            if shared.follow_up.swap(false, Ordering::SeqCst) {
                debug!("Running queued refresh cycle");
                shared.tick();
            }
            report
        }))
    }

    /// Like [`tick`](Self::tick), but a tick that hits an in-flight cycle
    /// owes one more cycle once that cycle ends. At most one is queued.
    fn tick_or_queue(self: &Arc<Self>) -> TickOutcome {
        match self.tick() {
            TickOutcome::SkippedInFlight => {
                self.follow_up.store(true, Ordering::SeqCst);
                // The in-flight cycle may have ended between the two steps.
                if !self.in_flight.load(Ordering::SeqCst)
                    && self.follow_up.swap(false, Ordering::SeqCst)
                {
                    return self.tick();
                }
                TickOutcome::SkippedInFlight
            }
            outcome => outcome,
        }
    }

    async fn run_cycle(&self, generation: u64) -> CycleReport {
        let symbols = self.holdings.symbols();
        if symbols.is_empty() {
            return CycleReport::NoSymbols;
        }

        debug!("Refreshing quotes for {} symbols", symbols.len());
        let batch = self.adapter.fetch_quotes(&symbols).await;

        if self.generation.load(Ordering::Acquire) != generation {
            debug!("Discarding quote refresh result: scheduler was stopped");
            return CycleReport::Superseded;
        }

        let report = match &batch.outcome {
            BatchOutcome::Skipped => CycleReport::NoSymbols,
            BatchOutcome::Failed { reason } => {
                warn!(
                    "Quote refresh failed, keeping {} last-known quotes: {}",
                    self.quote_book.len(),
                    reason
                );
                self.update_status(|s| {
                    s.consecutive_failures += 1;
                    s.last_error = Some(reason.to_string());
                    s.session_expired = *reason == FetchFailure::SessionExpired;
                });
                CycleReport::Failed {
                    reason: reason.clone(),
                }
            }
            BatchOutcome::Complete | BatchOutcome::Partial { .. } => {
                let applied = self.quote_book.apply(&batch, || self.holdings.symbols());
                info!(
                    "Quotes refreshed: {}/{} symbols resolved",
                    batch.quotes.len(),
                    batch.requested.len()
                );
                self.update_status(|s| {
                    s.consecutive_failures = 0;
                    s.last_success = Some(Utc::now());
                    s.last_error = None;
                    s.session_expired = false;
                });
                CycleReport::Applied {
                    requested: batch.requested.len(),
                    outcome: batch.outcome.clone(),
                    report: applied,
                }
            }
        };

        self.completed.send_modify(|count| *count += 1);
        report
    }
}

/// Drives periodic quote refreshes for the live holding set.
///
/// Must be used from within a tokio runtime. Dropping the scheduler stops
/// the timer.
pub struct RefreshScheduler {
    shared: Arc<SchedulerShared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(
        holdings: SharedHoldings,
        quote_book: Arc<QuoteBook>,
        adapter: Arc<QuoteAdapter>,
        config: &EngineConfig,
    ) -> Self {
        let (completed, _) = watch::channel(0);
        Self {
            shared: Arc::new(SchedulerShared {
                holdings,
                quote_book,
                adapter,
                period: config.refresh_interval,
                in_flight: AtomicBool::new(false),
                follow_up: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                status: RwLock::new(RefreshStatus::default()),
                completed,
            }),
            timer: Mutex::new(None),
        }
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(|poisoned| {
            warn!("Refresh timer lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Starts or clears the timer to match the current holding set.
    ///
    /// A set that became non-empty starts the timer and runs a cycle right
    /// away; an empty set clears it. Other changes need no action since each
    /// cycle reads the live set.
    pub fn on_holdings_changed(&self) -> SchedulerTransition {
        if self.shared.holdings.is_empty() {
            if self.cancel_timer() {
                info!("Refresh scheduler deactivated: no holdings");
                return SchedulerTransition::Deactivated;
            }
            return SchedulerTransition::Unchanged;
        }

        if self.start_timer() {
            info!(
                "Refresh scheduler activated (every {:?})",
                self.shared.period
            );
            return SchedulerTransition::Activated;
        }
        SchedulerTransition::Unchanged
    }

    /// Runs a refresh cycle now unless one is already in flight.
    pub fn tick(&self) -> TickOutcome {
        self.shared.tick()
    }

    /// Runs a refresh cycle now, or right after the one in flight.
    ///
    /// Used when the holding set changed, so a new symbol is not left
    /// unpriced for a whole interval.
    pub fn request_refresh(&self) -> TickOutcome {
        self.shared.tick_or_queue()
    }

    /// Clears the timer. A cycle still in flight completes, but its result
    /// is ignored.
    pub fn stop(&self) {
        if self.cancel_timer() {
            info!("Refresh scheduler stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock_timer()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn is_fetching(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn status(&self) -> RefreshStatus {
        self.shared
            .status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Receiver of the number of completed cycles; changes after every
    /// applied or failed cycle.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.completed.subscribe()
    }

    fn start_timer(&self) -> bool {
        let mut timer = self.lock_timer();
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let weak: Weak<SchedulerShared> = Arc::downgrade(&self.shared);
        let period = self.shared.period;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut activation = true;
            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                // Only the activation tick waits out a cycle left over from
                // an earlier activation; periodic ticks are dropped.
                let outcome = if activation {
                    shared.tick_or_queue()
                } else {
                    shared.tick()
                };
                activation = false;
                if let TickOutcome::Idle = outcome {
                    debug!("Refresh timer exiting: no holdings");
                    break;
                }
            }
        }));
        true
    }

    /// Aborts the timer and invalidates in-flight cycles. Returns whether a
    /// running timer was cleared.
    fn cancel_timer(&self) -> bool {
        let handle = self.lock_timer().take();
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        self.shared.follow_up.store(false, Ordering::SeqCst);
        match handle {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                was_running
            }
            None => false,
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
