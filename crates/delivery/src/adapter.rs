//! Top-level delivery entry point: simulation mode short-circuits before
//! the breaker is ever touched; the live path is wrapped in retry +
//! circuit breaker so a failing provider fails fast for the orchestrator
//! (§4.4, §7).

use std::time::Duration;

use pipeline_core::config::{DeliveryConfig, ResilienceConfig};
use pipeline_resilience::{retry_with_backoff, BreakerError, CircuitBreaker, RetryPolicy};
use tracing::warn;

use crate::error::DeliveryError;
use crate::live::LiveDeliveryClient;
use crate::simulate::simulate_send;
use crate::types::{SendRequest, SendResult};

pub struct DeliveryAdapter {
    live: Option<LiveDeliveryClient>,
    breaker: CircuitBreaker,
    retry_policy: RetryPolicy,
    provider_label: String,
}

impl DeliveryAdapter {
    pub fn new(config: &DeliveryConfig, resilience: &ResilienceConfig) -> Result<Self, DeliveryError> {
        let live = if config.simulate {
            None
        } else {
            Some(LiveDeliveryClient::new(config.clone())?)
        };

        Ok(Self {
            live,
            breaker: CircuitBreaker::new(
                resilience.breaker_failure_threshold,
                Duration::from_secs(resilience.breaker_recovery_timeout_secs),
            ),
            retry_policy: RetryPolicy::new(
                resilience.retry_max_attempts,
                Duration::from_millis(resilience.retry_initial_delay_ms),
                Duration::from_millis(resilience.retry_max_delay_ms),
                resilience.retry_exponential_base,
            ),
            provider_label: "lightfield".to_string(),
        })
    }

    /// Never raises: every failure path is folded into a `SendResult` with
    /// `status = failed` so the orchestrator can always persist an
    /// OutreachLog row for the attempt (§4.6 step 6).
    pub async fn send(&self, req: &SendRequest) -> SendResult {
        let Some(live) = self.live.as_ref() else {
            return simulate_send(req);
        };

        let policy = self.retry_policy.clone();
        let result = self
            .breaker
            .call("delivery.send", || async {
                retry_with_backoff(&policy, "delivery.send", || live.send(req)).await
            })
            .await;

        match result {
            Ok(message_id) => SendResult::sent(message_id, &self.provider_label),
            Err(BreakerError::Open) => {
                warn!("delivery circuit breaker open, failing fast");
                SendResult::failed(&self.provider_label, "circuit breaker open")
            }
            Err(BreakerError::Inner(err)) => {
                warn!(error = %err, "delivery send failed");
                SendResult::failed(&self.provider_label, err.to_string())
            }
        }
    }

    pub async fn check_status(&self, message_id: &str) -> Result<String, DeliveryError> {
        match self.live.as_ref() {
            Some(live) => live.check_status(message_id).await,
            None => Ok("sent".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SendRequest {
        SendRequest {
            to_email: "jane@acme.test".into(),
            to_name: Some("Jane".into()),
            subject: "Hi".into(),
            body: "Body".into(),
            tracking_id: "track-1".into(),
        }
    }

    #[tokio::test]
    async fn simulation_mode_never_fails() {
        let config = DeliveryConfig {
            api_key: None,
            base_url: "https://api.lightfield.ai/v1".into(),
            request_timeout_secs: 30,
            simulate: true,
        };
        let resilience = ResilienceConfig {
            retry_max_attempts: 3,
            retry_initial_delay_ms: 1,
            retry_max_delay_ms: 5,
            retry_exponential_base: 2.0,
            breaker_failure_threshold: 5,
            breaker_recovery_timeout_secs: 60,
        };
        let adapter = DeliveryAdapter::new(&config, &resilience).unwrap();
        let result = adapter.send(&request()).await;
        assert!(result.is_sent());
        assert_eq!(result.provider, "simulate");
    }
}
