mod subscription_model;
mod subscription_service;
mod subscription_traits;

pub use subscription_model::{PlanTier, SubscriptionStatus};
pub use subscription_service::SubscriptionService;
pub use subscription_traits::SubscriptionRepositoryTrait;
