//! Bounded retry with exponential backoff for recognition calls.

use std::time::Duration;

use tracing::warn;

use crate::error::RecognitionError;
use crate::models::config::RetryConfig;

/// How often, and how patiently, a failed recognition is retried.
///
/// Only errors for which [`RecognitionError::is_retryable`] holds are
/// retried; a missing or unsupported source fails on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            multiplier: 2.0,
            max_backoff: initial_backoff.saturating_mul(10),
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff(),
            multiplier: config.multiplier.max(1.0),
            max_backoff: config.max_backoff(),
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Total number of attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_backoff.as_secs_f64()))
    }

    /// Run `operation` until it succeeds, fails for good or runs out of
    /// attempts. The closure receives the 1-based attempt number.
    pub fn run<T, F>(&self, mut operation: F) -> Result<T, RecognitionError>
    where
        F: FnMut(u32) -> Result<T, RecognitionError>,
    {
        let mut attempt = 1;
        loop {
            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt <= self.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "Recognition attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts(),
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100))
            .with_multiplier(2.0)
            .with_max_backoff(Duration::from_millis(300));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(300));
        assert_eq!(policy.backoff(4), Duration::from_millis(300));
    }

    #[test]
    fn test_retries_are_bounded() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let mut calls = 0;
        let result: Result<(), _> = policy.run(|_| {
            calls += 1;
            Err(RecognitionError::Engine("busy".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_succeeds_after_transient_failure() {
        let policy = RetryPolicy::new(2, Duration::ZERO);
        let result = policy.run(|attempt| {
            if attempt < 2 {
                Err(RecognitionError::Engine("busy".into()))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn test_environmental_errors_not_retried() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut calls = 0;
        let result: Result<(), _> = policy.run(|_| {
            calls += 1;
            Err(RecognitionError::SourceNotFound(PathBuf::from("/missing.png")))
        });
        assert!(matches!(result, Err(RecognitionError::SourceNotFound(_))));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_none_policy() {
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }
}
