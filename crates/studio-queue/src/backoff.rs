//! Retry policy for failed jobs.

use std::time::Duration;

/// Exponential backoff with a cap and an attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Delay before the first retry
    pub base: Duration,
    /// Upper bound for any single delay
    pub max: Duration,
    /// Total attempts (first delivery included) before dead-lettering
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            max: Duration::from_secs(300),
            max_attempts: 3,
        }
    }
}

impl Backoff {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max,
            max_attempts: max_attempts.max(1),
        }
    }

    /// `base * 2^attempt`, capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Whether a job that has now failed `failed_attempts` times is spent.
    pub fn exhausted(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let backoff = Backoff::new(Duration::from_secs(2), Duration::from_secs(30), 5);
        assert_eq!(backoff.delay(0), Duration::from_secs(2));
        assert_eq!(backoff.delay(1), Duration::from_secs(4));
        assert_eq!(backoff.delay(3), Duration::from_secs(16));
        assert_eq!(backoff.delay(4), Duration::from_secs(30));
        assert_eq!(backoff.delay(40), Duration::from_secs(30));
    }

    #[test]
    fn test_exhaustion() {
        let backoff = Backoff::new(Duration::from_millis(10), Duration::from_secs(1), 3);
        assert!(!backoff.exhausted(2));
        assert!(backoff.exhausted(3));
        assert_eq!(Backoff::new(Duration::ZERO, Duration::ZERO, 0).max_attempts, 1);
    }
}
