//! Scorer worker (§4.5): consumes `leads.raw`, scores, persists, emits
//! `leads.scored`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use pipeline_core::bucket::{normalize_employee_count, normalize_revenue};
use pipeline_core::config::EventLogConfig;
use pipeline_core::event::{LeadRawEvent, LeadScoredEvent, ScoringSubDocument};
use pipeline_core::entity::Persona;
use pipeline_db::repo::leads::{self, NewScoredLead};
use pipeline_eventlog::EventLogClient;
use pipeline_scoring::{ScoringAdapter, ScoringInput};

pub struct ScorerWorker {
    pool: PgPool,
    eventlog: Arc<EventLogClient>,
    scoring: Arc<ScoringAdapter>,
    config: EventLogConfig,
}

impl ScorerWorker {
    pub fn new(
        pool: PgPool,
        eventlog: Arc<EventLogClient>,
        scoring: Arc<ScoringAdapter>,
        config: EventLogConfig,
    ) -> Self {
        Self { pool, eventlog, scoring, config }
    }

    pub async fn run(&self, shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
        let group_id = format!("{}-scorer", self.config.consumer_group_prefix);
        let topic = self.config.topic_leads_raw.clone();

        self.eventlog
            .consume(&[topic.as_str()], &group_id, shutdown, |key, payload| {
                let this = self;
                async move { this.handle(&key, &payload).await }
            })
            .await?;

        Ok(())
    }

    async fn handle(&self, key: &str, payload: &str) -> Result<(), String> {
        let raw: LeadRawEvent = serde_json::from_str(payload)
            .map_err(|e| format!("malformed leads.raw payload for key {key}: {e}"))?;

        // Step 1: idempotence against redelivery.
        if let Some(existing) = leads::find_by_external_id(&self.pool, &raw.external_id)
            .await
            .map_err(|e| e.to_string())?
        {
            info!(external_id = %raw.external_id, lead_id = %existing.id, "lead already scored, skipping");
            return Ok(());
        }

        // Step 2: normalize company/metadata into the scoring adapter schema.
        let scoring_input = ScoringInput {
            company_name: raw.company.name.clone().unwrap_or_default(),
            industry: raw.company.industry.clone().unwrap_or_default(),
            employee_count: normalize_employee_count(raw.company.size.as_deref()),
            revenue: normalize_revenue(raw.metadata.budget_range.as_deref()),
            website: raw.company.website.clone().unwrap_or_default(),
        };

        // Step 3: invoke the scoring adapter; map persona case-insensitively.
        let output = self.scoring.score(&scoring_input).await;
        let persona = Persona::from_label(&output.persona);
        let scored_at = Utc::now();

        let scoring_metadata = serde_json::json!({
            "reasoning": output.reasoning,
            "model_version": output.model_version,
            "confidence": serde_json::Value::Null,
            "mock": output.mock,
            "scoring_input": scoring_input,
            "raw_persona": output.persona,
            "scored_at": scored_at,
        });

        let new_lead = NewScoredLead {
            external_id: raw.external_id.clone(),
            contact_name: raw.contact.name.clone(),
            contact_email: raw.contact.email.clone(),
            contact_title: raw.contact.title.clone(),
            company_name: raw.company.name.clone(),
            company_industry: raw.company.industry.clone(),
            company_size_bucket: raw.company.size.clone(),
            company_website: raw.company.website.clone(),
            raw_payload: serde_json::to_value(&raw).unwrap_or(serde_json::Value::Null),
            score: output.score,
            persona,
            scoring_metadata: scoring_metadata.clone(),
        };

        // Step 4/5/6: insert + emit inside one transaction; a failed emit
        // rolls back the insert so a redelivered raw event isn't filtered
        // out by step 1 while leaving no `leads.scored` record behind (§4.5).
        let mut tx = self.pool.begin().await.map_err(|e| e.to_string())?;
        let lead = leads::insert_scored(&mut tx, &new_lead).await.map_err(|e| e.to_string())?;

        let scored_event = LeadScoredEvent {
            raw: raw.clone(),
            scoring: ScoringSubDocument {
                score: output.score,
                persona: persona.to_string(),
                reasoning: output.reasoning.clone(),
                model_version: output.model_version.clone(),
                mock: output.mock,
                confidence: None,
                scoring_input: serde_json::to_value(&scoring_input).unwrap_or(serde_json::Value::Null),
                scored_at,
            },
            db_id: lead.id.to_string(),
        };

        let event_json = serde_json::to_string(&scored_event).map_err(|e| e.to_string())?;
        if let Err(e) = self
            .eventlog
            .publish(&self.config.topic_leads_scored, &raw.external_id, &event_json)
            .await
        {
            warn!(external_id = %raw.external_id, error = %e, "leads.scored emit failed, rolling back lead insert");
            tx.rollback().await.map_err(|e| e.to_string())?;
            return Err(format!("leads.scored publish failed: {e}"));
        }

        tx.commit().await.map_err(|e| e.to_string())?;
        info!(external_id = %raw.external_id, lead_id = %lead.id, score = output.score, persona = %persona, "lead scored");
        Ok(())
    }
}
