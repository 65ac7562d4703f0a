//! Template accessors (§3, §4.6 step 4).

use std::str::FromStr;

use serde_json::Value as Json;
use sqlx::PgPool;

use pipeline_core::entity::Channel;
use pipeline_core::model::OutreachTemplate;

use crate::error::DbError;

#[derive(Debug, sqlx::FromRow)]
pub struct TemplateRow {
    pub template_id: String,
    pub experiment_id: String,
    pub subject_line: Option<String>,
    pub body_template: String,
    pub personalization_prompt: Option<String>,
    pub channel: String,
    pub config: Json,
    pub is_active: bool,
}

impl TemplateRow {
    pub fn into_entity(self) -> Result<OutreachTemplate, DbError> {
        Ok(OutreachTemplate {
            template_id: self.template_id,
            experiment_id: self.experiment_id,
            subject_line: self.subject_line,
            body_template: self.body_template,
            personalization_prompt: self.personalization_prompt,
            channel: Channel::from_str(&self.channel)
                .map_err(|e| DbError::Decode(format!("channel: {e}")))?,
            config: self.config,
            is_active: self.is_active,
        })
    }
}

/// One active template for the experiment, picked deterministically
/// (lowest `template_id`) when more than one is active. Returns `None`
/// when the experiment has no active template, which the orchestrator
/// treats as a configuration error per §4.6 step 4 / §7.
pub async fn find_active_for_experiment(
    pool: &PgPool,
    experiment_id: &str,
) -> Result<Option<OutreachTemplate>, DbError> {
    let row = sqlx::query_as::<_, TemplateRow>(
        "SELECT * FROM outreach_templates WHERE experiment_id = $1 AND is_active = TRUE \
         ORDER BY template_id LIMIT 1",
    )
    .bind(experiment_id)
    .fetch_optional(pool)
    .await?;
    row.map(TemplateRow::into_entity).transpose()
}
