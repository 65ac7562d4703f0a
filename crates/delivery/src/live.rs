//! Live HTTP path to the outbound messaging provider (§6, outbound HTTP
//! delivery contract): bearer auth, JSON body, bounded request timeout.

use serde_json::json;

use pipeline_core::config::DeliveryConfig;

use crate::error::DeliveryError;
use crate::types::SendRequest;

pub struct LiveDeliveryClient {
    client: reqwest::Client,
    config: DeliveryConfig,
}

impl LiveDeliveryClient {
    pub fn new(config: DeliveryConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// POST `/messages/email/send`. Returns the provider's `message_id` on
    /// success; HTTP 4xx/5xx is surfaced as `DeliveryError::Api` rather
    /// than panicking — the adapter layer maps that into a failed
    /// `SendResult` so nothing propagates across the worker boundary.
    pub async fn send(&self, req: &SendRequest) -> Result<String, DeliveryError> {
        let api_key = self.config.api_key.as_ref().ok_or(DeliveryError::NotConfigured)?;
        let url = format!("{}/messages/email/send", self.config.base_url);

        let body = json!({
            "to": {"email": req.to_email, "name": req.to_name},
            "from": {"name": "Pipeline"},
            "subject": req.subject,
            "body": req.body,
            "tracking_id": req.tracking_id,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api { status, body });
        }

        let parsed: serde_json::Value = response.json().await?;
        let message_id = parsed
            .get("message_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DeliveryError::Api {
                status,
                body: "response missing message_id".to_string(),
            })?
            .to_string();

        Ok(message_id)
    }

    /// GET `/messages/{id}/status`, used for out-of-band reconciliation
    /// when an engagement webhook is delayed or dropped.
    pub async fn check_status(&self, message_id: &str) -> Result<String, DeliveryError> {
        let api_key = self.config.api_key.as_ref().ok_or(DeliveryError::NotConfigured)?;
        let url = format!("{}/messages/{}/status", self.config.base_url, message_id);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Api { status, body });
        }

        let parsed: serde_json::Value = response.json().await?;
        Ok(parsed
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string())
    }
}
