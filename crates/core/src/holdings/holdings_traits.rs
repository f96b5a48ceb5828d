//! Holding repository trait.
//!
//! The remote API is the source of truth for holdings; the store only keeps
//! an in-memory copy.

use async_trait::async_trait;

use super::holdings_model::{Holding, HoldingId, NewHolding};
use crate::errors::Result;

/// Trait defining the contract for holding persistence.
#[async_trait]
pub trait HoldingRepositoryTrait: Send + Sync {
    /// Lists the user's holdings in server order.
    async fn list(&self) -> Result<Vec<Holding>>;

    /// Creates a holding and returns it with its server-assigned id.
    ///
    /// Fails with `Error::QuotaExceeded` when the plan's holding cap is hit.
    async fn create(&self, new_holding: NewHolding) -> Result<Holding>;

    /// Deletes a holding. Fails with `Error::NotFound` for an unknown id.
    async fn delete(&self, id: HoldingId) -> Result<()>;
}
