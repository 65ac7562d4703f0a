//! Top-level personalization entry point (§4.4): always substitutes first,
//! then optionally runs the remote-agent rewrite pass. A rewrite failure
//! falls back to the plain substituted text rather than failing the
//! orchestrator's render step.

use std::collections::HashMap;

use pipeline_core::config::ScoringConfig;
use tracing::warn;

use crate::rewrite::RewriteClient;
use crate::substitute::{render, Rendered};

pub struct PersonalizationAdapter {
    rewrite: Option<RewriteClient>,
}

impl PersonalizationAdapter {
    /// `rewrite_config` is `None` when remote-agent rewriting is disabled;
    /// substitution-only is always a complete, working adapter on its own.
    pub fn new(rewrite_config: Option<ScoringConfig>) -> Self {
        let rewrite = rewrite_config.and_then(|cfg| RewriteClient::new(cfg).ok());
        Self { rewrite }
    }

    pub async fn personalize(
        &self,
        subject_line: Option<&str>,
        body_template: &str,
        personalization_prompt: Option<&str>,
        lead_data: &HashMap<String, String>,
    ) -> Rendered {
        let rendered = render(subject_line, body_template, lead_data);

        let (Some(rewrite), Some(instructions)) = (self.rewrite.as_ref(), personalization_prompt) else {
            return rendered;
        };
        if instructions.trim().is_empty() {
            return rendered;
        }

        match rewrite.rewrite(&rendered, instructions).await {
            Ok(r) => r,
            Err(err) => {
                warn!(error = %err, "personalization rewrite failed, using substituted template");
                rendered
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn substitution_only_when_rewrite_disabled() {
        let adapter = PersonalizationAdapter::new(None);
        let mut data = HashMap::new();
        data.insert("company_name".to_string(), "Acme".to_string());
        let rendered = adapter
            .personalize(None, "Hello {{company_name}}", Some("make it punchier"), &data)
            .await;
        assert_eq!(rendered.body, "Hello Acme");
        assert_eq!(rendered.subject, "Acme \u{d7} Pipeline");
    }
}
