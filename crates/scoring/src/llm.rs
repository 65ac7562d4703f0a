//! OpenAI-style chat-completions client used for the primary scoring path.

use serde_json::json;
use tracing::debug;

use pipeline_core::config::ScoringConfig;

use crate::error::ScoringError;
use crate::rubric::{system_prompt, ScoringInput};

pub struct LlmClient {
    client: reqwest::Client,
    config: ScoringConfig,
}

impl LlmClient {
    pub fn new(config: ScoringConfig) -> Result<Self, ScoringError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn model_version(&self) -> &str {
        &self.config.model
    }

    /// Sends the lead for scoring and returns the raw JSON text the model produced.
    pub async fn score(&self, input: &ScoringInput) -> Result<String, ScoringError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(ScoringError::NotConfigured)?;

        let url = format!("{}/chat/completions", self.config.base_url);

        let user_message = json!({
            "company_name": input.company_name,
            "industry": input.industry,
            "employee_count": input.employee_count,
            "revenue": input.revenue,
            "website": input.website,
        })
        .to_string();

        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt()},
                {"role": "user", "content": user_message},
            ],
            "response_format": {"type": "json_object"},
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        debug!(%url, "scoring request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(ScoringError::Api { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ScoringError::Parse("missing choices[0].message.content".into()))?
            .to_string();

        Ok(content)
    }
}
