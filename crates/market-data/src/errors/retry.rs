use std::time::Duration;

/// Classification for retry policy.
///
/// | Class | Spend another attempt? |
/// |-------|------------------------|
/// | `Never` | No, the cycle fails with this error |
/// | `WithBackoff` | Yes, if the [`RetryBudget`] still has attempts left |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - bad token, malformed response, or provider-side failure.
    Never,

    /// Transient failure such as a timeout or a 429.
    WithBackoff,
}

/// State reported by [`RetryBudget::next_attempt`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryState {
    /// Another attempt may be made. `attempt` is 1-based.
    Ready { attempt: u32 },
    /// Terminal: every attempt has been spent.
    Exhausted,
}

/// Bounded retry counter.
///
/// Counts attempts up to `1 + max_retries` and then stays in
/// [`RetryState::Exhausted`]. Backoff doubles per attempt starting from
/// `base_backoff`.
#[derive(Clone, Debug)]
pub struct RetryBudget {
    max_attempts: u32,
    attempts: u32,
    base_backoff: Duration,
}

impl RetryBudget {
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            attempts: 0,
            base_backoff,
        }
    }

    /// Consume one attempt.
    pub fn next_attempt(&mut self) -> RetryState {
        if self.attempts >= self.max_attempts {
            return RetryState::Exhausted;
        }
        self.attempts += 1;
        RetryState::Ready {
            attempt: self.attempts,
        }
    }

    /// Whether a further call to `next_attempt` would return `Ready`.
    pub fn has_remaining(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay to wait before the next attempt.
    pub fn backoff(&self) -> Duration {
        let exponent = self.attempts.saturating_sub(1).min(6);
        self.base_backoff.saturating_mul(1 << exponent)
    }
}
