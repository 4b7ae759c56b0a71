//! Retry policies for failed tasks.

use std::time::Duration;

use crate::jobs::task::queues;

/// Exponential backoff policy. Every queue uses the same shape; only the
/// attempt budget and initial delay differ.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, initial_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_delay_ms,
            multiplier: 2.0,
            max_delay_ms: 300_000, // 5 minutes
        }
    }

    /// Delay before retry number `attempt` (1-based: the delay after the
    /// first failure is `delay_for_attempt(1)`).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32 - 1);
        Duration::from_millis((delay as u64).min(self.max_delay_ms))
    }
}

/// Per-queue policies. Extraction is local work and retries quickly; the
/// AI-calling queues wait longer between attempts to ride out provider
/// rate limits.
pub fn policy_for(queue: &str) -> RetryPolicy {
    match queue {
        queues::EXTRACT => RetryPolicy::new(3, 2_000),
        queues::ANALYSIS | queues::MATCHING => RetryPolicy::new(4, 5_000),
        _ => RetryPolicy::new(3, 2_000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_delays() {
        let policy = RetryPolicy::new(4, 1_000);
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4_000));
    }

    #[test]
    fn test_delay_capped_at_max() {
        let policy = RetryPolicy::new(20, 1_000);
        assert_eq!(
            policy.delay_for_attempt(15),
            Duration::from_millis(policy.max_delay_ms)
        );
    }

    #[test]
    fn test_attempt_zero_has_no_delay() {
        let policy = RetryPolicy::new(3, 1_000);
        assert_eq!(policy.delay_for_attempt(0), Duration::ZERO);
    }

    #[test]
    fn test_ai_queues_wait_longer_than_extract() {
        assert!(
            policy_for(queues::MATCHING).initial_delay_ms
                > policy_for(queues::EXTRACT).initial_delay_ms
        );
    }
}
