//! Exponential backoff for transient provider failures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry configuration for embedding calls.
///
/// The wait after the zero-based `attempt` fails is
/// `backoff_unit * min(2^attempt, max_backoff_units)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,

    /// Length of one backoff unit.
    #[serde(with = "duration_ms", rename = "backoff_unit_ms")]
    pub backoff_unit: Duration,

    /// Upper bound on the backoff multiplier.
    pub max_backoff_units: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_unit: Duration::from_secs(1),
            max_backoff_units: 10,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set the number of attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff unit.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Backoff multiplier for a zero-based attempt number.
    pub fn backoff_units(&self, attempt: u32) -> u32 {
        2u32.checked_pow(attempt)
            .unwrap_or(u32::MAX)
            .min(self.max_backoff_units)
    }

    /// How long to wait after the zero-based `attempt` fails.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * self.backoff_units(attempt)
    }

    /// Whether another attempt may follow the zero-based `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy::default();
        let units: Vec<u32> = (0..6).map(|a| policy.backoff_units(a)).collect();
        assert_eq!(units, vec![1, 2, 4, 8, 10, 10]);
        assert_eq!(policy.backoff_units(40), 10);
    }

    #[test]
    fn test_delay_scales_with_unit() {
        let policy = RetryPolicy::default().with_backoff_unit(Duration::from_millis(5));
        assert_eq!(policy.delay_for(0), Duration::from_millis(5));
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(9), Duration::from_millis(50));
    }

    #[test]
    fn test_attempt_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.should_retry(0));
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert!(!RetryPolicy::no_retry().should_retry(0));
    }
}
