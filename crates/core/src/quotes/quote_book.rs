//! Symbol-keyed store of the latest quote per held symbol.
//!
//! Merge rules for a refresh result:
//!
//! - a failed or skipped batch changes nothing (last-known quotes are kept)
//! - a returned quote replaces the previous one wholesale
//! - a requested symbol missing from a successful batch is cleared
//! - quotes for symbols no longer held are discarded

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use stockboard_market_data::{Quote, QuoteBatch, QuoteMap};

/// What an [`QuoteBook::apply`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Quotes written for symbols still held.
    pub applied: usize,
    /// Returned quotes dropped because the symbol is no longer held.
    pub discarded: usize,
    /// Previously known quotes removed because the symbol was unresolved.
    pub cleared: usize,
}

#[derive(Debug, Default)]
struct BookState {
    quotes: QuoteMap,
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct QuoteBook {
    state: RwLock<BookState>,
}

impl QuoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BookState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("Quote book lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, BookState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("Quote book lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Merges a refresh result, keyed by symbol, against the symbols held
    /// at the time the result arrived.
    ///
    /// `live_symbols` is read while the book is write-locked, so a removal
    /// that pruned the book beforehand is always visible here.
    pub fn apply<F>(&self, batch: &QuoteBatch, live_symbols: F) -> ApplyReport
    where
        F: FnOnce() -> BTreeSet<String>,
    {
        let mut report = ApplyReport::default();
        if batch.is_failure() {
            return report;
        }

        let mut state = self.write();
        let live_symbols = live_symbols();
        for symbol in &batch.requested {
            if !live_symbols.contains(symbol) {
                if batch.quotes.contains_key(symbol) {
                    report.discarded += 1;
                }
                state.quotes.remove(symbol);
                continue;
            }

            match batch.quotes.get(symbol) {
                Some(quote) => {
                    state.quotes.insert(symbol.clone(), quote.clone());
                    report.applied += 1;
                }
                None => {
                    if state.quotes.remove(symbol).is_some() {
                        report.cleared += 1;
                    }
                }
            }
        }

        if report.applied > 0 {
            state.last_updated = Some(Utc::now());
        }

        debug!(
            "Quote book updated: {} applied, {} discarded, {} cleared",
            report.applied, report.discarded, report.cleared
        );
        report
    }

    /// Drops quotes for symbols that are no longer held.
    pub fn retain_symbols(&self, live_symbols: &BTreeSet<String>) -> usize {
        let mut state = self.write();
        let before = state.quotes.len();
        state.quotes.retain(|symbol, _| live_symbols.contains(symbol));
        before - state.quotes.len()
    }

    pub fn snapshot(&self) -> QuoteMap {
        self.read().quotes.clone()
    }

    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.read().quotes.get(symbol).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().quotes.is_empty()
    }

    /// Whether at least one quote was ever obtained and is still held.
    pub fn has_any(&self) -> bool {
        !self.is_empty()
    }

    /// When a refresh last wrote a quote.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.read().last_updated
    }
}
