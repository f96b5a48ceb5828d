use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, warn};
use tokio::time::Instant;

use super::subscription_model::SubscriptionStatus;
use super::subscription_traits::SubscriptionRepositoryTrait;
use crate::constants::SUBSCRIPTION_CACHE_TTL_SECS;

/// Cached plan lookup.
///
/// A failed lookup, including an expired session, reports the free tier and
/// is not cached, so the next call asks the server again.
pub struct SubscriptionService {
    repository: Arc<dyn SubscriptionRepositoryTrait>,
    ttl: Duration,
    cached: RwLock<Option<(SubscriptionStatus, Instant)>>,
}

impl SubscriptionService {
    pub fn new(repository: Arc<dyn SubscriptionRepositoryTrait>) -> Self {
        Self::with_ttl(repository, Duration::from_secs(SUBSCRIPTION_CACHE_TTL_SECS))
    }

    pub fn with_ttl(repository: Arc<dyn SubscriptionRepositoryTrait>, ttl: Duration) -> Self {
        Self {
            repository,
            ttl,
            cached: RwLock::new(None),
        }
    }

    fn cached_status(&self) -> Option<SubscriptionStatus> {
        let cached = self
            .cached
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let fresh = cached
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < self.ttl)
            .map(|(status, _)| status.clone());
        fresh
    }

    pub async fn status(&self) -> SubscriptionStatus {
        if let Some(status) = self.cached_status() {
            return status;
        }

        match self.repository.get_status().await {
            Ok(status) => {
                debug!("Subscription status: {:?}", status.tier);
                *self
                    .cached
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) =
                    Some((status.clone(), Instant::now()));
                status
            }
            Err(e) => {
                warn!("Subscription lookup failed, assuming free tier: {}", e);
                SubscriptionStatus::free()
            }
        }
    }

    pub async fn is_premium(&self) -> bool {
        self.status().await.is_premium()
    }

    /// Forgets the cached status.
    pub fn invalidate(&self) {
        *self
            .cached
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
