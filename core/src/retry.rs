//! Retry policy for protocol adapters.
//!
//! Retries live entirely inside adapters; the execution engine only ever
//! sees final results. An adapter that wants retry behavior consults a
//! `RetryPolicy` for whether and when to re-attempt.

use std::time::Duration;

use crate::error::BenchError;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first one.
    pub max_attempts: u32,
    /// Coefficient to multiply initial_interval with for every past attempt.
    pub backoff_coefficient: u32,
    /// The backoff interval for the first retry.
    pub initial_interval: Duration,
    /// The maximum possible backoff between retries.
    pub maximum_interval: Option<Duration>,
}

impl RetryPolicy {
    /// Initialize a `RetryPolicyBuilder`.
    pub fn build(backoff_coefficient: u32, initial_interval: Duration) -> RetryPolicyBuilder {
        RetryPolicyBuilder::new(backoff_coefficient, initial_interval)
    }

    /// Whether a failed attempt should be retried at all: the error must be
    /// transient and the attempt budget not yet spent.
    pub fn should_retry(&self, error: &BenchError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }

    /// Determine the backoff interval before retrying at a given attempt
    /// number (1-based), capped at `maximum_interval` when configured.
    pub fn retry_interval(&self, attempt: u32) -> Duration {
        let candidate =
            self.initial_interval * self.backoff_coefficient.pow(attempt.saturating_sub(1));
        match self.maximum_interval {
            Some(max_interval) => std::cmp::min(candidate, max_interval),
            None => candidate,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicyBuilder::default().provide()
    }
}

/// Builder pattern struct to provide a `RetryPolicy`.
pub struct RetryPolicyBuilder {
    pub max_attempts: u32,
    pub backoff_coefficient: u32,
    pub initial_interval: Duration,
    pub maximum_interval: Option<Duration>,
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_coefficient: 2,
            initial_interval: Duration::from_millis(100),
            maximum_interval: None,
        }
    }
}

impl RetryPolicyBuilder {
    pub fn new(backoff_coefficient: u32, initial_interval: Duration) -> Self {
        Self {
            backoff_coefficient,
            initial_interval,
            ..RetryPolicyBuilder::default()
        }
    }

    pub fn max_attempts(mut self, attempts: u32) -> RetryPolicyBuilder {
        self.max_attempts = attempts;
        self
    }

    pub fn maximum_interval(mut self, interval: Duration) -> RetryPolicyBuilder {
        self.maximum_interval = Some(interval);
        self
    }

    /// Provide a `RetryPolicy` according to build parameters provided thus far.
    pub fn provide(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff_coefficient: self.backoff_coefficient,
            initial_interval: self.initial_interval,
            maximum_interval: self.maximum_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_retry_interval() {
        let retry_policy = RetryPolicy::build(1, Duration::from_secs(2)).provide();
        assert_eq!(retry_policy.retry_interval(1), Duration::from_secs(2));
        assert_eq!(retry_policy.retry_interval(2), Duration::from_secs(2));
        assert_eq!(retry_policy.retry_interval(3), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_interval_never_exceeds_maximum() {
        let retry_policy = RetryPolicy::build(2, Duration::from_secs(2))
            .maximum_interval(Duration::from_secs(4))
            .provide();
        assert_eq!(retry_policy.retry_interval(1), Duration::from_secs(2));
        assert_eq!(retry_policy.retry_interval(2), Duration::from_secs(4));
        assert_eq!(retry_policy.retry_interval(3), Duration::from_secs(4));
        assert_eq!(retry_policy.retry_interval(4), Duration::from_secs(4));
    }

    #[test]
    fn test_exponential_backoff() {
        let retry_policy = RetryPolicy::build(2, Duration::from_millis(100)).provide();
        assert_eq!(retry_policy.retry_interval(1), Duration::from_millis(100));
        assert_eq!(retry_policy.retry_interval(2), Duration::from_millis(200));
        assert_eq!(retry_policy.retry_interval(3), Duration::from_millis(400));
    }

    #[test]
    fn test_should_retry_respects_budget_and_kind() {
        let retry_policy = RetryPolicy::build(2, Duration::from_millis(10))
            .max_attempts(3)
            .provide();

        assert!(retry_policy.should_retry(&BenchError::OperationTimeout, 1));
        assert!(retry_policy.should_retry(&BenchError::OperationTimeout, 2));
        assert!(!retry_policy.should_retry(&BenchError::OperationTimeout, 3));
        assert!(!retry_policy.should_retry(&BenchError::OperationProtocol("bad".into()), 1));
        assert!(!retry_policy.should_retry(&BenchError::Cancelled, 1));
    }
}
