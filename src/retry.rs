//! Retry policy for transient upstream failures.
//!
//! Implements exponential backoff with configurable parameters.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Errors that know whether repeating the request can help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff duration in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds (cap for exponential growth).
    pub max_backoff_ms: u64,
    /// Multiplier applied to backoff after each retry.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Backoff before retry number `retry_count` (0-based):
    /// `initial_backoff * multiplier^retry_count`, capped at `max_backoff_ms`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let backoff =
            self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(retry_count as i32);
        Duration::from_millis(backoff.min(self.max_backoff_ms as f64) as u64)
    }

    pub fn should_retry<E: Retryable>(&self, error: &E, retry_count: u32) -> bool {
        error.is_retryable() && retry_count < self.max_retries
    }

    /// Run `op` until it succeeds, fails permanently, or the budget is spent.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retry_count = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e, retry_count) => {
                    let delay = self.backoff(retry_count);
                    warn!(
                        %operation,
                        error = %e,
                        attempt = retry_count + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Transient upstream failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (retryable: {})", self.retryable)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 1,
            backoff_multiplier: 1.0,
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn test_backoff_capping() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff_ms: 100,
            max_backoff_ms: 300,
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(300));
        assert_eq!(policy.backoff(8), Duration::from_millis(300));
    }

    #[test]
    fn test_should_retry() {
        let policy = fast_policy(2);
        let transient = TestError { retryable: true };
        let permanent = TestError { retryable: false };

        assert!(policy.should_retry(&transient, 0));
        assert!(policy.should_retry(&transient, 1));
        assert!(!policy.should_retry(&transient, 2));
        assert!(!policy.should_retry(&permanent, 0));
        assert!(!RetryPolicy::none().should_retry(&transient, 0));
    }

    #[tokio::test]
    async fn test_run_retries_transient_errors_until_success() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result: Result<u32, TestError> = fast_policy(2)
            .run("test", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TestError { retryable: true })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_budget() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result: Result<(), TestError> = fast_policy(1)
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError { retryable: true })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_does_not_retry_permanent_errors() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;

        let result: Result<(), TestError> = fast_policy(3)
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(TestError { retryable: false })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
