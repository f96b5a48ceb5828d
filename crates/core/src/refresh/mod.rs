//! Refresh module - periodic quote refresh for the held symbols.

mod refresh_model;
mod scheduler;

#[cfg(test)]
mod scheduler_tests;

pub use refresh_model::{CycleReport, RefreshStatus, SchedulerTransition, TickOutcome};
pub use scheduler::RefreshScheduler;
