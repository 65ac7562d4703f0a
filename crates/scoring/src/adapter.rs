//! Top-level scoring entry point: tries the LLM path behind a circuit
//! breaker and retry policy, falling back to the deterministic heuristic
//! on any failure so scoring never fails outright.

use std::time::Duration;

use pipeline_core::config::ScoringConfig;
use pipeline_resilience::{retry_with_backoff, BreakerError, CircuitBreaker, RetryPolicy};
use tracing::warn;

use crate::error::ScoringError;
use crate::fallback::fallback_score;
use crate::llm::LlmClient;
use crate::rubric::{ScoringInput, ScoringOutput};

pub struct ScoringAdapter {
    llm: Option<LlmClient>,
    breaker: CircuitBreaker,
    retry_policy: RetryPolicy,
}

impl ScoringAdapter {
    pub fn new(config: &ScoringConfig, resilience: &pipeline_core::config::ResilienceConfig) -> Result<Self, ScoringError> {
        let llm = if config.mock {
            None
        } else {
            Some(LlmClient::new(config.clone())?)
        };

        let breaker = CircuitBreaker::new(
            resilience.breaker_failure_threshold,
            Duration::from_secs(resilience.breaker_recovery_timeout_secs),
        );
        let retry_policy = RetryPolicy::new(
            resilience.retry_max_attempts,
            Duration::from_millis(resilience.retry_initial_delay_ms),
            Duration::from_millis(resilience.retry_max_delay_ms),
            resilience.retry_exponential_base,
        );

        Ok(Self { llm, breaker, retry_policy })
    }

    pub async fn score(&self, input: &ScoringInput) -> ScoringOutput {
        let Some(llm) = self.llm.as_ref() else {
            return fallback_score(input);
        };

        let result = self
            .breaker
            .call("scoring.llm", || async { self.call_and_parse(llm, input).await })
            .await;

        match result {
            Ok(output) => output,
            Err(BreakerError::Open) => {
                warn!("scoring circuit breaker open, using fallback");
                fallback_score(input)
            }
            Err(BreakerError::Inner(err)) => {
                warn!(error = %err, "scoring LLM path failed, using fallback");
                fallback_score(input)
            }
        }
    }

    async fn call_and_parse(&self, llm: &LlmClient, input: &ScoringInput) -> Result<ScoringOutput, ScoringError> {
        let policy = self.retry_policy.clone();
        let raw = retry_with_backoff(&policy, "scoring.llm.call", || llm.score(input)).await?;
        let mut output = parse_llm_response(&raw)?;
        output.model_version = llm.model_version().to_string();
        Ok(output)
    }
}

/// Parses the model's JSON response, tolerating a markdown code fence wrapper.
fn parse_llm_response(raw: &str) -> Result<ScoringOutput, ScoringError> {
    let trimmed = raw.trim();
    let json_text = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim_end_matches("```").trim())
        .unwrap_or(trimmed);

    let value: serde_json::Value =
        serde_json::from_str(json_text).map_err(|e| ScoringError::Parse(e.to_string()))?;

    let score = value
        .get("score")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ScoringError::Parse("missing score".into()))?;
    let persona = value
        .get("persona")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScoringError::Parse("missing persona".into()))?
        .to_string();
    let reasoning = value
        .get("reasoning")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(ScoringOutput {
        score: score.clamp(0.0, 1.0),
        persona,
        reasoning,
        model_version: String::new(),
        mock: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json() {
        let raw = r#"{"score": 0.9, "persona": "enterprise", "reasoning": "large org"}"#;
        let out = parse_llm_response(raw).unwrap();
        assert_eq!(out.score, 0.9);
        assert_eq!(out.persona, "enterprise");
        assert!(!out.mock);
    }

    #[test]
    fn parses_markdown_fenced_json() {
        let raw = "```json\n{\"score\": 0.6, \"persona\": \"smb\", \"reasoning\": \"mid size\"}\n```";
        let out = parse_llm_response(raw).unwrap();
        assert_eq!(out.score, 0.6);
        assert_eq!(out.persona, "smb");
    }

    #[test]
    fn rejects_missing_score_field() {
        let raw = r#"{"persona": "smb", "reasoning": "x"}"#;
        assert!(parse_llm_response(raw).is_err());
    }

    #[test]
    fn clamps_out_of_range_scores() {
        let raw = r#"{"score": 1.5, "persona": "enterprise", "reasoning": "x"}"#;
        let out = parse_llm_response(raw).unwrap();
        assert_eq!(out.score, 1.0);
    }
}
