//! Stockboard Core - holdings, valuation and price refresh.
//!
//! This crate contains the engine behind the portfolio dashboard. It is
//! transport-agnostic: holding persistence and plan lookups are traits
//! implemented by the `stockboard-connect` crate, quotes come through a
//! `stockboard-market-data` provider.

pub mod constants;
pub mod errors;
pub mod holdings;
pub mod quotes;
pub mod refresh;
pub mod settings;
pub mod subscription;
pub mod tracker;
pub mod valuation;

pub use holdings::{Holding, HoldingId, HoldingRepositoryTrait, HoldingStore, NewHolding};
pub use refresh::{RefreshScheduler, RefreshStatus, TickOutcome};
pub use settings::EngineConfig;
pub use tracker::{PortfolioSnapshot, PortfolioTracker};
pub use valuation::{PortfolioSummary, PositionMetrics};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
