//! Exponential-backoff retry wrapper for fallible async operations.

use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration, exponential_base: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            exponential_base,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            exponential_base: 2.0,
        }
    }
}

/// Run `op` up to `policy.max_retries + 1` times, sleeping with exponential
/// backoff (capped at `max_delay`) between attempts. Returns the last error
/// if every attempt fails.
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, name: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = policy.initial_delay;

    for attempt in 0..=policy.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt == policy.max_retries {
                    error!(operation = name, attempts = attempt + 1, error = %e, "retries exhausted");
                    return Err(e);
                }
                warn!(
                    operation = name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * policy.exponential_base).min(policy.max_delay.as_secs_f64()),
                );
            }
        }
    }

    unreachable!("loop always returns on its final iteration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(&policy, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5), 2.0);
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(&policy, "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("transient")
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_retries_and_returns_last_error() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(5), 2.0);
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(&policy, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("still failing")
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3); // 1 initial + 2 retries
    }
}
