use async_trait::async_trait;

use super::subscription_model::SubscriptionStatus;
use crate::errors::Result;

/// Source of the user's plan.
#[async_trait]
pub trait SubscriptionRepositoryTrait: Send + Sync {
    async fn get_status(&self) -> Result<SubscriptionStatus>;
}
