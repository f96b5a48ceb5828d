/// Default interval between quote refresh cycles, in seconds
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

/// Default upper bound for one quote lookup, in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default number of extra attempts after a transient quote failure
pub const DEFAULT_FETCH_RETRIES: u32 = 1;

/// Default delay before retrying a quote lookup, in milliseconds
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Holding cap on the free plan. Enforced by the server; display only.
pub const FREE_HOLDING_LIMIT: usize = 10;

/// How long a subscription status lookup stays cached, in seconds
pub const SUBSCRIPTION_CACHE_TTL_SECS: u64 = 5 * 60;

/// Shown next to a quota error
pub const UPGRADE_HINT: &str = "Upgrade to premium to track more holdings.";

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Hundred, for percentage math
pub(crate) const HUNDRED: rust_decimal::Decimal = rust_decimal::Decimal::ONE_HUNDRED;
