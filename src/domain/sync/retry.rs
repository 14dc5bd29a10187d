//! Retry policy for platform API calls.
//!
//! One policy is used at every retrying call site: exponential backoff
//! with the processor- or platform-specified retry-after taking precedence
//! when it is longer, capped at a maximum delay, and a hard attempt limit.

use std::time::Duration;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts, counting the first call.
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Upper bound on any computed delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// True when another attempt is allowed after `attempt` failures.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Delay before retry number `attempt` (0-based: the delay after the
    /// first failure is `delay_for(0, …)`).
    ///
    /// The delay is `max(base * 2^attempt, retry_after)` capped at
    /// `max_delay`, so an explicit rate-limit signal is always honored.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        let delay = match retry_after {
            Some(hint) if hint > exp => hint,
            _ => exp,
        };
        delay.min(self.max_delay)
    }
}
