//! Retry policy for delivery jobs.

#![allow(missing_docs)]

use std::time::Duration;

use crate::classifier::ErrorClass;

/// Retry configuration with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum delivery attempts before a message is dropped.
    pub max_delivery_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_delivery_attempts: 5,
            initial_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(3600 * 24),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay before the given attempt number (1-indexed: the
    /// first retry is attempt 2).
    #[must_use]
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2);
        let delay_secs =
            self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent as i32);
        let delay = Duration::from_secs_f64(delay_secs);

        if delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}

/// Where a failed delivery goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureRoute {
    /// Ack and forget (permanent failure or attempts exhausted).
    Ack,
    /// Re-enqueue on the retry topic after the given delay.
    Retry(Duration),
}

/// Route a classified failure for a job on its `attempt`-th delivery.
#[must_use]
pub fn route_failure(class: ErrorClass, attempt: u32, config: &RetryConfig) -> FailureRoute {
    if !class.retryable {
        return FailureRoute::Ack;
    }
    let next_attempt = attempt + 1;
    if next_attempt > config.max_delivery_attempts {
        return FailureRoute::Ack;
    }
    FailureRoute::Retry(config.delay_before_attempt(next_attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let config = RetryConfig::default();

        // Delay before the second delivery (first retry): 60s
        assert_eq!(config.delay_before_attempt(2), Duration::from_secs(60));
        assert_eq!(config.delay_before_attempt(3), Duration::from_secs(120));
        assert_eq!(config.delay_before_attempt(4), Duration::from_secs(240));
        assert_eq!(config.delay_before_attempt(5), Duration::from_secs(480));
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_delivery_attempts: 20,
            initial_delay: Duration::from_secs(3600),
            max_delay: Duration::from_secs(7200),
            multiplier: 2.0,
        };

        assert_eq!(config.delay_before_attempt(10), Duration::from_secs(7200));
    }

    #[test]
    fn test_unretryable_failure_acks() {
        let class = ErrorClass {
            retryable: false,
            reportable: false,
        };
        assert_eq!(
            route_failure(class, 1, &RetryConfig::default()),
            FailureRoute::Ack
        );
    }

    #[test]
    fn test_retryable_failure_requeues_until_exhausted() {
        let config = RetryConfig {
            max_delivery_attempts: 3,
            ..RetryConfig::default()
        };
        let class = ErrorClass {
            retryable: true,
            reportable: false,
        };

        assert!(matches!(
            route_failure(class, 1, &config),
            FailureRoute::Retry(_)
        ));
        assert!(matches!(
            route_failure(class, 2, &config),
            FailureRoute::Retry(_)
        ));
        // Attempt 3 was the last allowed delivery.
        assert_eq!(route_failure(class, 3, &config), FailureRoute::Ack);
    }
}
