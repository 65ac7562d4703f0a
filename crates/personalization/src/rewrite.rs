//! Optional remote-agent rewrite path (§4.4): takes the already-substituted
//! subject/body and asks an LLM to adjust tone/length per the template's
//! `personalization_prompt`. Reuses the scoring adapter's LLM provider
//! credentials (`ScoringConfig`) since this pipeline doesn't stand up a
//! second model endpoint just for copy rewriting.

use serde_json::json;

use pipeline_core::config::ScoringConfig;

use crate::error::PersonalizationError;
use crate::substitute::Rendered;

pub struct RewriteClient {
    client: reqwest::Client,
    config: ScoringConfig,
}

impl RewriteClient {
    pub fn new(config: ScoringConfig) -> Result<Self, PersonalizationError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub async fn rewrite(
        &self,
        rendered: &Rendered,
        instructions: &str,
    ) -> Result<Rendered, PersonalizationError> {
        let Some(api_key) = self.config.api_key.as_ref() else {
            return Ok(rendered.clone());
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let user_message = json!({
            "subject": rendered.subject,
            "body": rendered.body,
            "instructions": instructions,
        })
        .to_string();

        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": "Rewrite the subject and body for tone and length per the instructions. Respond with JSON: {\"subject\": <string>, \"body\": <string>}."},
                {"role": "user", "content": user_message},
            ],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
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
        if status != 200 {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PersonalizationError::Api { status, body: body_text });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["choices"][0]["message"]["content"].as_str().unwrap_or_default();

        let parsed: serde_json::Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(_) => return Ok(rendered.clone()),
        };

        Ok(Rendered {
            subject: parsed
                .get("subject")
                .and_then(|v| v.as_str())
                .unwrap_or(&rendered.subject)
                .to_string(),
            body: parsed
                .get("body")
                .and_then(|v| v.as_str())
                .unwrap_or(&rendered.body)
                .to_string(),
        })
    }
}
