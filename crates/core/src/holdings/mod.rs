//! Holdings module - the user's self-reported positions.

mod holdings_model;
mod holdings_store;
mod holdings_traits;


pub use holdings_model::{Holding, HoldingId, NewHolding};
pub use holdings_store::{HoldingStore, SharedHoldings};
pub use holdings_traits::HoldingRepositoryTrait;
