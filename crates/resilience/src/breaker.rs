//! Circuit breaker for wrapping remote adapter calls (§7, §9).

use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
}

/// Stateful wrapper that fails fast after `failure_threshold` consecutive
/// failures and probes recovery once `recovery_timeout` has elapsed.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<Inner>,
}

#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    #[error("circuit breaker open")]
    Open,
    #[error(transparent)]
    Inner(#[from] E),
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                last_failure_at: None,
            }),
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    /// Call `op` through the breaker. When open and the recovery timeout
    /// has not elapsed, returns `BreakerError::Open` without invoking `op`.
    pub async fn call<T, E, F, Fut>(&self, name: &str, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == BreakerState::Open {
                let elapsed = inner
                    .last_failure_at
                    .map(|t| t.elapsed() >= self.recovery_timeout)
                    .unwrap_or(true);
                if elapsed {
                    inner.state = BreakerState::HalfOpen;
                    info!(breaker = name, "circuit breaker entering half-open state");
                } else {
                    return Err(BreakerError::Open);
                }
            }
        }

        match op().await {
            Ok(value) => {
                self.on_success(name);
                Ok(value)
            }
            Err(e) => {
                self.on_failure(name);
                Err(BreakerError::Inner(e))
            }
        }
    }

    fn on_success(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count = 0;
        if inner.state == BreakerState::HalfOpen {
            inner.state = BreakerState::Closed;
            info!(breaker = name, "circuit breaker closed after successful call");
        }
    }

    fn on_failure(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.failure_count += 1;
        inner.last_failure_at = Some(Instant::now());

        if inner.failure_count >= self.failure_threshold {
            inner.state = BreakerState::Open;
            warn!(breaker = name, failures = inner.failure_count, "circuit breaker opened");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_failures_and_fails_fast() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));

        for _ in 0..2 {
            let _: Result<(), BreakerError<&str>> =
                breaker.call("test", || async { Err("boom") }).await;
        }
        assert_eq!(breaker.state(), BreakerState::Open);

        let result: Result<(), BreakerError<&str>> = breaker.call("test", || async { Ok(()) }).await;
        assert!(matches!(result, Err(BreakerError::Open)));
    }

    #[tokio::test]
    async fn half_opens_after_recovery_timeout_and_closes_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let _: Result<(), BreakerError<&str>> = breaker.call("test", || async { Err("boom") }).await;
        assert_eq!(breaker.state(), BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(20)).await;

        let result: Result<(), BreakerError<&str>> = breaker.call("test", || async { Ok(()) }).await;
        assert!(result.is_ok());
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[tokio::test]
    async fn stays_closed_below_threshold() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(60));
        let _: Result<(), BreakerError<&str>> = breaker.call("test", || async { Err("boom") }).await;
        assert_eq!(breaker.state(), BreakerState::Closed);
    }
}
