// Retry policy - bounded exponential backoff for transient step failures
use crate::error::StepError;
use backoff::{future::retry_notify, ExponentialBackoff};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_secs(4),
            max_interval: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without waiting. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(1),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or uses up
    /// `max_attempts`. Permanent failures return on the first attempt.
    pub async fn run<T, F, Fut>(&self, step: &str, mut operation: F) -> Result<T, StepError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StepError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        let op = || {
            attempt += 1;
            let current = attempt;
            let fut = operation();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_transient() && current < max_attempts => {
                        Err(backoff::Error::transient(e))
                    }
                    Err(e) => Err(backoff::Error::permanent(e)),
                }
            }
        };

        retry_notify(self.backoff(), op, |e: StepError, wait: Duration| {
            warn!("🔄 Retrying {} after {} (next attempt in {:?})", step, e, wait);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_transient_failures_use_whole_budget() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), StepError> = RetryPolicy::immediate(3)
            .run("flaky", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StepError::transient("test", "timeout"))
            })
            .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result: Result<(), StepError> = RetryPolicy::immediate(3)
            .run("broken", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StepError::permanent("test", "not found"))
            })
            .await;

        assert!(!result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = RetryPolicy::immediate(3)
            .run("recovering", || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(StepError::transient("test", "503"))
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_policy_matches_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_interval, Duration::from_secs(4));
        assert_eq!(policy.max_interval, Duration::from_secs(10));
    }
}
