//! Feedback worker (§4.7): consumes `outreach.events`, updates the
//! per-experiment Beta posterior, and transitions lead/outreach-log state.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use pipeline_core::config::EventLogConfig;
use pipeline_core::entity::LeadStatus;
use pipeline_core::event::{outreach_event_types as evt, OutreachEvent};
use pipeline_db::repo::{leads, outreach_logs};
use pipeline_db::txn;
use pipeline_eventlog::EventLogClient;

pub struct FeedbackWorker {
    pool: sqlx::PgPool,
    eventlog: Arc<EventLogClient>,
    config: EventLogConfig,
    /// `0` disables the mechanism, matching the source's observed
    /// behavior of never incrementing beta on non-conversion (§9).
    conversion_window_days: u32,
}

impl FeedbackWorker {
    pub fn new(
        pool: sqlx::PgPool,
        eventlog: Arc<EventLogClient>,
        config: EventLogConfig,
        conversion_window_days: u32,
    ) -> Self {
        Self { pool, eventlog, config, conversion_window_days }
    }

    pub async fn run(&self, shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
        let group_id = format!("{}-feedback", self.config.consumer_group_prefix);
        let topic = self.config.topic_outreach_events.clone();

        self.eventlog
            .consume(&[topic.as_str()], &group_id, shutdown, |key, payload| {
                let this = self;
                async move { this.handle(&key, &payload).await }
            })
            .await?;

        Ok(())
    }

    async fn handle(&self, _key: &str, payload: &str) -> Result<(), String> {
        let event: OutreachEvent = serde_json::from_str(payload)
            .map_err(|e| format!("malformed outreach.events payload: {e}"))?;

        match event.event_type.as_str() {
            t if t == evt::OPENED => self.on_opened(&event).await,
            t if t == evt::CLICKED => self.on_clicked(&event).await,
            t if t == evt::REPLIED => self.on_replied(&event).await,
            t if t == evt::CONVERTED => self.on_converted(&event).await,
            t if t == evt::SENT || t == evt::BOUNCED => {
                info!(event_type = t, external_id = %event.external_id, "no feedback-worker action for this event type");
                Ok(())
            }
            other => {
                warn!(event_type = other, external_id = %event.external_id, "unrecognized outreach event type, committing (forward compatibility)");
                Ok(())
            }
        }
    }

    async fn resolve_log_and_lead(&self, event: &OutreachEvent) -> Result<Option<(Uuid, Uuid, String)>, String> {
        let lead = leads::find_by_external_id(&self.pool, &event.external_id)
            .await
            .map_err(|e| e.to_string())?;
        let Some(lead) = lead else {
            warn!(external_id = %event.external_id, "outreach event for unknown lead, committing");
            return Ok(None);
        };

        let log = match &event.message_id {
            Some(message_id) => outreach_logs::find_by_external_message_id(&self.pool, message_id)
                .await
                .map_err(|e| e.to_string())?,
            None => outreach_logs::find_latest_for_lead(&self.pool, lead.id)
                .await
                .map_err(|e| e.to_string())?,
        };
        let Some(log) = log else {
            warn!(external_id = %event.external_id, "outreach event with no matching outreach log, committing");
            return Ok(None);
        };

        let experiment_id = event.experiment_id.clone().unwrap_or(log.experiment_id.clone());
        Ok(Some((log.id, lead.id, experiment_id)))
    }

    async fn on_opened(&self, event: &OutreachEvent) -> Result<(), String> {
        let Some((log_id, ..)) = self.resolve_log_and_lead(event).await? else {
            return Ok(());
        };
        txn::apply_opened(&self.pool, log_id).await.map_err(|e| e.to_string())?;
        self.maybe_apply_beta_timeout(event).await?;
        Ok(())
    }

    async fn on_clicked(&self, event: &OutreachEvent) -> Result<(), String> {
        let Some((log_id, ..)) = self.resolve_log_and_lead(event).await? else {
            return Ok(());
        };
        txn::apply_clicked(&self.pool, log_id).await.map_err(|e| e.to_string())?;
        self.maybe_apply_beta_timeout(event).await?;
        Ok(())
    }

    async fn on_replied(&self, event: &OutreachEvent) -> Result<(), String> {
        let Some((log_id, lead_id, experiment_id)) = self.resolve_log_and_lead(event).await? else {
            return Ok(());
        };
        let applied = txn::apply_replied(&self.pool, log_id, lead_id, &experiment_id)
            .await
            .map_err(|e| e.to_string())?;
        if applied {
            info!(external_id = %event.external_id, experiment_id, "lead responded");
        } else {
            info!(external_id = %event.external_id, "reply event for already-responded lead, skipping (dedupe)");
        }
        self.maybe_apply_beta_timeout(event).await?;
        Ok(())
    }

    /// §9-resolved beta-timeout policy: a no-op unless `conversion_window_days`
    /// is configured nonzero. Checked opportunistically on every feedback
    /// event that touches a given lead (there's no batch scheduler in scope),
    /// so a lead that replied but never converted accrues the `beta`
    /// increment the next time any engagement event for it arrives, once
    /// `contacted_at + conversion_window_days` has elapsed. Dedup rides on
    /// `processed_feedback_events`, not the lead state machine, since a lead
    /// can sit in `responded` indefinitely.
    async fn maybe_apply_beta_timeout(&self, event: &OutreachEvent) -> Result<(), String> {
        if self.conversion_window_days == 0 {
            return Ok(());
        }

        let Some(lead) = leads::find_by_external_id(&self.pool, &event.external_id)
            .await
            .map_err(|e| e.to_string())?
        else {
            return Ok(());
        };

        if lead.status != LeadStatus::Responded {
            return Ok(());
        }
        let Some(contacted_at) = lead.contacted_at else {
            return Ok(());
        };
        let Some(experiment_id) = lead.assigned_experiment_id.as_deref() else {
            return Ok(());
        };

        let deadline = contacted_at + ChronoDuration::days(self.conversion_window_days as i64);
        if Utc::now() < deadline {
            return Ok(());
        }

        let applied = txn::apply_beta_timeout_once(&self.pool, &event.external_id, experiment_id)
            .await
            .map_err(|e| e.to_string())?;
        if applied {
            info!(external_id = %event.external_id, experiment_id, "conversion window elapsed without conversion, beta incremented");
        }
        Ok(())
    }

    async fn on_converted(&self, event: &OutreachEvent) -> Result<(), String> {
        let Some((_, lead_id, experiment_id)) = self.resolve_log_and_lead(event).await? else {
            return Ok(());
        };

        // At-most-once: a redelivered conversion event finds the lead
        // already `converted` and the update touches zero rows (§8, §9).
        let applied = txn::apply_converted(&self.pool, lead_id, &experiment_id)
            .await
            .map_err(|e| e.to_string())?;

        if applied {
            info!(external_id = %event.external_id, experiment_id, "lead converted, alpha incremented");
        } else {
            info!(external_id = %event.external_id, "conversion event for already-converted lead, skipping (dedupe)");
        }

        Ok(())
    }
}
