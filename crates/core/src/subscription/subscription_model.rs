//! Subscription plan models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Premium,
}

/// The user's current plan.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub tier: PlanTier,
    pub is_active: bool,
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionStatus {
    /// Status assumed when the plan cannot be looked up.
    pub fn free() -> Self {
        Self::default()
    }

    pub fn is_premium(&self) -> bool {
        self.tier == PlanTier::Premium && self.is_active
    }
}
