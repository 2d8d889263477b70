//! Bounded retry policy shared by single-page and batch loading

use std::time::Duration;

/// How many times a fetch may be attempted and how long to wait in between.
///
/// `max_attempts` counts every attempt including the first one, so the
/// default of 3 means one initial request plus at most two retries. There is
/// no unbounded mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    /// Per-attempt transport timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            timeout,
        }
    }

    /// Whether another attempt is allowed after `attempts_made` have failed
    pub fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts.max(1)
    }
}
