//! JSON payload shapes carried on the event log topics (§6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

fn now() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Company {
    pub name: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Contact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub title: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Source {
    pub channel: Option<String>,
    pub campaign: Option<String>,
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LeadMetadata {
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub pain_points: Vec<String>,
    pub budget_range: Option<String>,
    pub timeline: Option<String>,
}

/// `leads.raw` — the inbound lead record, as produced by the lead-generation
/// collaborator (out of scope, see §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRawEvent {
    #[serde(default = "default_event_type_lead_created")]
    pub event_type: String,
    #[serde(default = "now")]
    pub timestamp: DateTime<Utc>,
    pub external_id: String,
    #[serde(default)]
    pub company: Company,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub metadata: LeadMetadata,
}

fn default_event_type_lead_created() -> String {
    "lead.created".to_string()
}

/// The scoring sub-document attached to a `leads.scored` record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSubDocument {
    pub score: f64,
    pub persona: String,
    pub reasoning: String,
    pub model_version: String,
    pub mock: bool,
    pub confidence: Option<f64>,
    pub scoring_input: Json,
    pub scored_at: DateTime<Utc>,
}

/// `leads.scored` — the raw record plus the scoring sub-document and the
/// persisted row's database id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadScoredEvent {
    #[serde(flatten)]
    pub raw: LeadRawEvent,
    pub scoring: ScoringSubDocument,
    pub db_id: String,
}

/// `outreach.events` — produced by the orchestrator and by the (out of
/// scope) engagement webhook receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachEvent {
    pub event_type: String,
    #[serde(default = "now")]
    pub timestamp: DateTime<Utc>,
    pub lead_id: String,
    pub external_id: String,
    pub experiment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion_value: Option<f64>,
}

pub mod outreach_event_types {
    pub const SENT: &str = "outreach.sent";
    pub const OPENED: &str = "outreach.opened";
    pub const CLICKED: &str = "outreach.clicked";
    pub const REPLIED: &str = "outreach.replied";
    pub const CONVERTED: &str = "outreach.converted";
    pub const BOUNCED: &str = "outreach.bounced";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lead_raw_event_roundtrips() {
        let json = r#"{
            "event_type": "lead.created",
            "timestamp": "2026-01-01T00:00:00Z",
            "external_id": "ext-1",
            "company": {"name": "Acme", "size": "1000+"},
            "contact": {"email": "jane@acme.test"},
            "source": {"channel": "web"},
            "metadata": {"budget_range": "500k+", "tech_stack": ["rust"]}
        }"#;
        let parsed: LeadRawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.external_id, "ext-1");
        assert_eq!(parsed.company.size.as_deref(), Some("1000+"));
        assert_eq!(parsed.metadata.tech_stack, vec!["rust".to_string()]);
    }

    #[test]
    fn lead_raw_event_defaults_missing_sections() {
        let json = r#"{"external_id": "ext-2"}"#;
        let parsed: LeadRawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.event_type, "lead.created");
        assert!(parsed.company.name.is_none());
    }
}
