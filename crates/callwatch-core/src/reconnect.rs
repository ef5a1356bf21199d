//! Reconnect policy.
//!
//! Linear backoff with a fixed attempt ceiling: attempt `n` (1-indexed)
//! waits `n × base_delay`. There is no jitter.

use std::time::Duration;

/// Default attempt ceiling.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default backoff step.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(2000);

/// When and how often a dropped session retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts allowed after a close before giving up.
    pub max_attempts: u32,
    /// Delay step; attempt `n` waits `n` steps.
    pub base_delay: Duration,
}

impl ReconnectPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before attempt `attempt` (1-indexed), or `None` once the
    /// ceiling is exceeded.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some(self.base_delay.saturating_mul(attempt))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<_> = (1..=5).map(|n| policy.delay_for(n).unwrap()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(2000),
                Duration::from_millis(4000),
                Duration::from_millis(6000),
                Duration::from_millis(8000),
                Duration::from_millis(10000),
            ]
        );
        assert_eq!(policy.delay_for(6), None);
        assert_eq!(policy.delay_for(0), None);
    }

    #[test]
    fn test_zero_attempts_never_waits() {
        let policy = ReconnectPolicy::new(0, DEFAULT_BASE_DELAY);
        assert_eq!(policy.delay_for(1), None);
    }
}
