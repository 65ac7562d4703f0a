use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use uuid::Uuid;

use crate::entity::{Channel, LeadStatus, OutreachStatus, Persona};

pub type LeadId = Uuid;
pub type OutreachLogId = Uuid;

/// A prospect record, one row per unique `external_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub external_id: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_title: Option<String>,
    pub company_name: Option<String>,
    pub company_industry: Option<String>,
    pub company_size_bucket: Option<String>,
    pub company_website: Option<String>,
    pub raw_payload: Json,
    pub score: Option<f64>,
    pub persona: Persona,
    pub status: LeadStatus,
    pub assigned_experiment_id: Option<String>,
    pub outreach_count: i32,
    pub response_count: i32,
    pub scoring_metadata: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub scored_at: Option<DateTime<Utc>>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// A bandit arm. `alpha`/`beta` are the Beta-distribution posterior
/// parameters; both start at and never fall below 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub variant: String,
    pub config: Json,
    pub alpha: f64,
    pub beta: f64,
    pub leads_assigned: i64,
    pub outreach_sent: i64,
    pub responses_received: i64,
    pub conversions: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Experiment {
    pub fn conversion_rate(&self) -> f64 {
        self.conversions as f64 / (self.leads_assigned.max(1)) as f64
    }

    pub fn response_rate(&self) -> f64 {
        self.responses_received as f64 / (self.outreach_sent.max(1)) as f64
    }
}

/// A message blueprint bound to one experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachTemplate {
    pub template_id: String,
    pub experiment_id: String,
    pub subject_line: Option<String>,
    pub body_template: String,
    pub personalization_prompt: Option<String>,
    pub channel: Channel,
    pub config: Json,
    pub is_active: bool,
}

/// A record of one outbound attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachLog {
    pub id: OutreachLogId,
    pub lead_id: LeadId,
    pub experiment_id: String,
    pub template_id: String,
    pub subject: String,
    pub body: String,
    pub channel: Channel,
    pub sent_via: String,
    pub external_message_id: Option<String>,
    pub status: OutreachStatus,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
