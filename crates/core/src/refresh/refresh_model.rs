//! Refresh cycle models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use stockboard_market_data::{BatchOutcome, FetchFailure};
use tokio::task::JoinHandle;

use crate::errors::Error;
use crate::quotes::ApplyReport;

/// Result of a single timer tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// A refresh cycle was spawned.
    Started(JoinHandle<CycleReport>),
    /// A previous cycle is still in flight; the tick was dropped.
    SkippedInFlight,
    /// Nothing is held, nothing to refresh.
    Idle,
}

impl TickOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, TickOutcome::Started(_))
    }
}

/// What a refresh cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// Quotes were merged into the quote book.
    Applied {
        requested: usize,
        outcome: BatchOutcome,
        report: ApplyReport,
    },
    /// The lookup failed; last-known quotes were kept.
    Failed { reason: FetchFailure },
    /// The scheduler was stopped before the response arrived.
    Superseded,
    /// The holding set was empty when the cycle ran.
    NoSymbols,
}

impl CycleReport {
    /// The failure as an engine error, for display.
    pub fn error(&self) -> Option<Error> {
        match self {
            CycleReport::Failed {
                reason: FetchFailure::SessionExpired,
            } => Some(Error::SessionExpired),
            CycleReport::Failed { reason } => {
                Some(Error::ProviderUnavailable(reason.to_string()))
            }
            _ => None,
        }
    }
}

/// Activation change caused by a holding set change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerTransition {
    /// The timer was started; the first cycle runs immediately.
    Activated,
    /// The holding set became empty and the timer was cleared.
    Deactivated,
    Unchanged,
}

/// Counters and last results of the refresh loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub cycles_started: u64,
    /// Ticks dropped because a cycle was still in flight.
    pub ticks_skipped: u64,
    pub consecutive_failures: u32,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// The last lookup was rejected with 401.
    pub session_expired: bool,
}
