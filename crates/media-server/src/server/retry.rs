//! Bind retry policy: exponential backoff with jitter, bounded attempts.

use std::time::Duration;

use rand::Rng;

/// How the listener reacts to consecutive bind failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures tolerated before giving up.
    pub limit: u32,
    /// Delay after the first failure.
    pub base: Duration,
    /// Upper bound on the delay before jitter.
    pub max: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failure number `attempt` (1-based).
    ///
    /// Doubles from `base`, caps at `max`, then adds up to 10% jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);

        let factor = 2u64.saturating_pow(attempt - 1);
        let capped = base_ms.saturating_mul(factor).min(max_ms);

        let jitter_range = capped / 10;
        let jitter = if jitter_range > 0 {
            rand::thread_rng().gen_range(0..jitter_range)
        } else {
            0
        };

        Duration::from_millis(capped.saturating_add(jitter))
    }

    /// True once `attempt` consecutive failures have used up the budget.
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt >= self.limit
    }
}
