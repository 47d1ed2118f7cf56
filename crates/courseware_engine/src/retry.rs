//! Retry policy for transient status-poll failures.

use std::time::Duration;

/// Decides whether a failed status request is retried and how long to wait.
///
/// Only transport failures of a single poll tick are retried. The counter is
/// reset by every successful status response.
#[derive(Debug, Clone, PartialEq)]
pub struct PollRetryPolicy {
    /// Consecutive failed ticks tolerated before the job fails. Zero disables retries.
    pub max_consecutive_failures: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Backoff multiplier applied per further consecutive failure.
    pub multiplier: f64,
}

impl Default for PollRetryPolicy {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl PollRetryPolicy {
    /// A policy that fails the job on the first failed tick.
    pub fn never() -> Self {
        Self {
            max_consecutive_failures: 0,
            ..Self::default()
        }
    }

    /// `failures` counts consecutive failed ticks including the current one.
    pub fn should_retry(&self, failures: u32) -> bool {
        failures <= self.max_consecutive_failures
    }

    /// Delay before the retry following the `failures`-th consecutive failure.
    ///
    /// delay = base_delay * multiplier^(failures - 1)
    pub fn next_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exponent);
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_backoff_increases() {
        let policy = PollRetryPolicy::default();
        assert_eq!(policy.next_delay(1), Duration::from_secs(1));
        assert_eq!(policy.next_delay(2), Duration::from_secs(2));
        assert_eq!(policy.next_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn zero_failures_uses_base_delay() {
        let policy = PollRetryPolicy::default();
        assert_eq!(policy.next_delay(0), policy.base_delay);
    }

    #[test]
    fn retries_stop_after_limit() {
        let policy = PollRetryPolicy::default();
        assert!(policy.should_retry(3));
        assert!(!policy.should_retry(4));
        assert!(!PollRetryPolicy::never().should_retry(1));
    }
}
