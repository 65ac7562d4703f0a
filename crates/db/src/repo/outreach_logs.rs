//! OutreachLog accessors (§3, §4.6, §4.7). Row creation and the
//! status-transition updates that span multiple tables live in `crate::txn`
//! since they're always part of a larger transactional unit; this module
//! holds the read paths the feedback worker uses to locate the log row an
//! engagement event refers to.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pipeline_core::entity::{Channel, OutreachStatus};
use pipeline_core::model::OutreachLog;

use crate::error::DbError;

#[derive(Debug, sqlx::FromRow)]
pub struct OutreachLogRow {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub experiment_id: String,
    pub template_id: String,
    pub subject: String,
    pub body: String,
    pub channel: String,
    pub sent_via: String,
    pub external_message_id: Option<String>,
    pub status: String,
    pub opened_at: Option<DateTime<Utc>>,
    pub clicked_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutreachLogRow {
    pub fn into_entity(self) -> Result<OutreachLog, DbError> {
        Ok(OutreachLog {
            id: self.id,
            lead_id: self.lead_id,
            experiment_id: self.experiment_id,
            template_id: self.template_id,
            subject: self.subject,
            body: self.body,
            channel: Channel::from_str(&self.channel)
                .map_err(|e| DbError::Decode(format!("channel: {e}")))?,
            sent_via: self.sent_via,
            external_message_id: self.external_message_id,
            status: OutreachStatus::from_str(&self.status)
                .map_err(|e| DbError::Decode(format!("outreach status: {e}")))?,
            opened_at: self.opened_at,
            clicked_at: self.clicked_at,
            replied_at: self.replied_at,
            retry_count: self.retry_count,
            error: self.error,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// The most recent outreach attempt for a lead, which is what an
/// engagement webhook event refers to when it doesn't carry an explicit
/// `message_id` (§4.7).
pub async fn find_latest_for_lead(pool: &PgPool, lead_id: Uuid) -> Result<Option<OutreachLog>, DbError> {
    let row = sqlx::query_as::<_, OutreachLogRow>(
        "SELECT * FROM outreach_logs WHERE lead_id = $1 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(lead_id)
    .fetch_optional(pool)
    .await?;
    row.map(OutreachLogRow::into_entity).transpose()
}

pub async fn find_by_external_message_id(
    pool: &PgPool,
    message_id: &str,
) -> Result<Option<OutreachLog>, DbError> {
    let row = sqlx::query_as::<_, OutreachLogRow>(
        "SELECT * FROM outreach_logs WHERE external_message_id = $1",
    )
    .bind(message_id)
    .fetch_optional(pool)
    .await?;
    row.map(OutreachLogRow::into_entity).transpose()
}
