//! Orchestrator worker (§4.6): consumes `leads.scored`, selects an
//! experiment via Thompson Sampling, renders and sends the outreach
//! message, writes the outreach log, and emits `outreach.events`.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{error, info, warn};

use pipeline_core::config::EventLogConfig;
use pipeline_core::event::{outreach_event_types, LeadScoredEvent, OutreachEvent};
use pipeline_core::model::Lead;
use pipeline_db::repo::{experiments, leads, templates};
use pipeline_db::txn;
use pipeline_delivery::{DeliveryAdapter, SendRequest};
use pipeline_eventlog::EventLogClient;
use pipeline_personalization::PersonalizationAdapter;

use crate::bandit::select_experiment;

/// Lead does not pass the contact threshold below this score (§4.6 step 2).
const CONTACT_THRESHOLD: f64 = 0.5;

pub struct OrchestratorWorker {
    pool: PgPool,
    eventlog: Arc<EventLogClient>,
    delivery: Arc<DeliveryAdapter>,
    personalization: Arc<PersonalizationAdapter>,
    config: EventLogConfig,
}

impl OrchestratorWorker {
    pub fn new(
        pool: PgPool,
        eventlog: Arc<EventLogClient>,
        delivery: Arc<DeliveryAdapter>,
        personalization: Arc<PersonalizationAdapter>,
        config: EventLogConfig,
    ) -> Self {
        Self { pool, eventlog, delivery, personalization, config }
    }

    pub async fn run(&self, shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
        let group_id = format!("{}-orchestrator", self.config.consumer_group_prefix);
        let topic = self.config.topic_leads_scored.clone();

        self.eventlog
            .consume(&[topic.as_str()], &group_id, shutdown, |key, payload| {
                let this = self;
                async move { this.handle(&key, &payload).await }
            })
            .await?;

        Ok(())
    }

    async fn handle(&self, _key: &str, payload: &str) -> Result<(), String> {
        let scored: LeadScoredEvent = serde_json::from_str(payload)
            .map_err(|e| format!("malformed leads.scored payload: {e}"))?;
        let external_id = scored.raw.external_id.clone();

        // Step 1: load the lead, skip if already past contact.
        let lead = leads::find_by_external_id(&self.pool, &external_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("leads.scored referenced unknown lead {external_id}"))?;

        if lead.status.is_at_least_contacted() {
            info!(external_id = %external_id, status = %lead.status, "lead already contacted, skipping");
            return Ok(());
        }

        // Step 2: score threshold.
        let Some(score) = lead.score else {
            info!(external_id = %external_id, "lead has no score yet, skipping");
            return Ok(());
        };
        if score < CONTACT_THRESHOLD {
            info!(external_id = %external_id, score, "score too low, skipping outreach");
            return Ok(());
        }

        // Step 3: Thompson Sampling over active experiments.
        let active = experiments::list_active(&self.pool).await.map_err(|e| e.to_string())?;
        let mut rng = rand::thread_rng();
        let Some(experiment) = select_experiment(&active, &mut rng) else {
            error!(external_id = %external_id, "no active experiments configured, leaving offset uncommitted");
            return Err("no active experiments configured".to_string());
        };
        let experiment_id = experiment.experiment_id.clone();

        // Step 4: one active template for that experiment.
        let Some(template) = templates::find_active_for_experiment(&self.pool, &experiment_id)
            .await
            .map_err(|e| e.to_string())?
        else {
            warn!(external_id = %external_id, experiment_id = %experiment_id, "no active template, committing orphan-experiment error");
            self.emit_error_event(&lead, &external_id, Some(&experiment_id), "no_active_template")
                .await;
            return Ok(());
        };

        // Step 5: render.
        let lead_data = lead_data_map(&lead);
        let rendered = self
            .personalization
            .personalize(
                template.subject_line.as_deref(),
                &template.body_template,
                template.personalization_prompt.as_deref(),
                &lead_data,
            )
            .await;

        // Step 6: send.
        let send_result = self
            .delivery
            .send(&SendRequest {
                to_email: lead.contact_email.clone().unwrap_or_default(),
                to_name: lead.contact_name.clone(),
                subject: rendered.subject.clone(),
                body: rendered.body.clone(),
                tracking_id: lead.id.to_string(),
            })
            .await;

        if !send_result.is_sent() {
            let error_text = send_result.error.clone().unwrap_or_else(|| "delivery failed".to_string());
            txn::record_failed_outreach(
                &self.pool,
                lead.id,
                &experiment_id,
                &template.template_id,
                &rendered.subject,
                &rendered.body,
                template.channel,
                &send_result.provider,
                &error_text,
            )
            .await
            .map_err(|e| e.to_string())?;

            warn!(external_id = %external_id, experiment_id = %experiment_id, error = %error_text, "delivery failed, outreach log recorded");
            return Ok(());
        }

        // Step 7: transactional success path.
        let message_id = send_result.message_id.clone().unwrap_or_default();
        txn::record_successful_outreach(
            &self.pool,
            lead.id,
            &experiment_id,
            &template.template_id,
            &rendered.subject,
            &rendered.body,
            template.channel,
            &send_result.provider,
            &message_id,
        )
        .await
        .map_err(|e| e.to_string())?;

        // Step 8: emit outreach.sent.
        let event = OutreachEvent {
            event_type: outreach_event_types::SENT.to_string(),
            timestamp: chrono::Utc::now(),
            lead_id: lead.id.to_string(),
            external_id: external_id.clone(),
            experiment_id: Some(experiment_id.clone()),
            template_id: Some(template.template_id.clone()),
            message_id: Some(message_id.clone()),
            conversion_value: None,
        };
        let event_json = serde_json::to_string(&event).map_err(|e| e.to_string())?;
        if let Err(e) = self
            .eventlog
            .publish(&self.config.topic_outreach_events, &external_id, &event_json)
            .await
        {
            // The send already happened and is durably recorded; a failed
            // emit here is logged but does not roll back the outreach —
            // unlike the scorer's emit, there is no equivalent "undo a
            // real-world send" operation available.
            warn!(external_id = %external_id, error = %e, "outreach.sent emit failed after successful send");
        }

        info!(external_id = %external_id, experiment_id = %experiment_id, message_id = %message_id, "outreach sent");
        Ok(())
    }

    async fn emit_error_event(&self, lead: &Lead, external_id: &str, experiment_id: Option<&str>, reason: &str) {
        let event = OutreachEvent {
            event_type: "outreach.error".to_string(),
            timestamp: chrono::Utc::now(),
            lead_id: lead.id.to_string(),
            external_id: external_id.to_string(),
            experiment_id: experiment_id.map(|s| s.to_string()),
            template_id: None,
            message_id: None,
            conversion_value: None,
        };
        warn!(external_id, ?experiment_id, reason, "emitting outreach.error event");
        if let Ok(json) = serde_json::to_string(&event) {
            let _ = self
                .eventlog
                .publish(&self.config.topic_outreach_events, external_id, &json)
                .await;
        }
    }
}

fn lead_data_map(lead: &Lead) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(v) = &lead.contact_name {
        map.insert("contact_name".to_string(), v.clone());
    }
    if let Some(v) = &lead.contact_email {
        map.insert("contact_email".to_string(), v.clone());
    }
    if let Some(v) = &lead.contact_title {
        map.insert("contact_title".to_string(), v.clone());
    }
    if let Some(v) = &lead.company_name {
        map.insert("company_name".to_string(), v.clone());
    }
    if let Some(v) = &lead.company_industry {
        map.insert("company_industry".to_string(), v.clone());
    }
    if let Some(v) = &lead.company_website {
        map.insert("company_website".to_string(), v.clone());
    }
    map.insert("persona".to_string(), lead.persona.to_string());
    map
}
