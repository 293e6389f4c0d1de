//! Retry policy: maps a failed attempt count to drop or delay.

use std::time::Duration;

/// Attempts after which an envelope is dropped.
pub const MAX_RETRIES: u32 = 3;

/// Attempt count from which the capped delay applies.
pub const RETRY_TIME_LIMIT: u32 = 2;

/// Default base interval for quadratic backoff.
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_secs(10);

/// Fixed delay once `RETRY_TIME_LIMIT` is reached.
pub const DEFAULT_CAPPED_DELAY: Duration = Duration::from_secs(120);

/// What to do with an envelope after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up; the envelope is lost.
    Drop,
    /// Requeue the envelope, eligible again after the delay.
    Retry(Duration),
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempt count at which envelopes are dropped.
    pub max_retries: u32,
    /// Attempt count from which `capped_delay` replaces quadratic backoff.
    pub time_limit: u32,
    /// Base interval `B` of the `(n + 1)^2 * B` backoff.
    pub base_interval: Duration,
    /// Delay used once `time_limit` is reached.
    pub capped_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            time_limit: RETRY_TIME_LIMIT,
            base_interval: DEFAULT_BASE_INTERVAL,
            capped_delay: DEFAULT_CAPPED_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Decide what happens after a failure, given the attempt count
    /// *before* it is incremented.
    pub fn decide(&self, attempt_count: u32) -> RetryDecision {
        if attempt_count >= self.max_retries {
            return RetryDecision::Drop;
        }

        if attempt_count >= self.time_limit {
            return RetryDecision::Retry(self.capped_delay);
        }

        let next = attempt_count.saturating_add(1);
        let factor = next.saturating_mul(next);
        RetryDecision::Retry(self.base_interval.saturating_mul(factor))
    }
}
