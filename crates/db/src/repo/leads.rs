//! Lead accessors (§3, §4.5). The scorer is the sole writer of new rows;
//! the orchestrator and feedback workers only transition `status` and the
//! engagement counters, always inside the transactional unit in `crate::txn`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::Value as Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use pipeline_core::entity::{LeadStatus, Persona};
use pipeline_core::model::Lead;

use crate::error::DbError;

#[derive(Debug, sqlx::FromRow)]
pub struct LeadRow {
    pub id: Uuid,
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
    pub persona: String,
    pub status: String,
    pub assigned_experiment_id: Option<String>,
    pub outreach_count: i32,
    pub response_count: i32,
    pub scoring_metadata: Option<Json>,
    pub created_at: DateTime<Utc>,
    pub scored_at: Option<DateTime<Utc>>,
    pub contacted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl LeadRow {
    pub fn into_entity(self) -> Result<Lead, DbError> {
        Ok(Lead {
            id: self.id,
            external_id: self.external_id,
            contact_name: self.contact_name,
            contact_email: self.contact_email,
            contact_title: self.contact_title,
            company_name: self.company_name,
            company_industry: self.company_industry,
            company_size_bucket: self.company_size_bucket,
            company_website: self.company_website,
            raw_payload: self.raw_payload,
            score: self.score,
            persona: Persona::from_label(&self.persona),
            status: LeadStatus::from_str(&self.status)
                .map_err(|e| DbError::Decode(format!("lead status: {e}")))?,
            assigned_experiment_id: self.assigned_experiment_id,
            outreach_count: self.outreach_count,
            response_count: self.response_count,
            scoring_metadata: self.scoring_metadata,
            created_at: self.created_at,
            scored_at: self.scored_at,
            contacted_at: self.contacted_at,
            updated_at: self.updated_at,
        })
    }
}

/// Input to `insert_scored`, the one place a Lead row is created.
pub struct NewScoredLead {
    pub external_id: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_title: Option<String>,
    pub company_name: Option<String>,
    pub company_industry: Option<String>,
    pub company_size_bucket: Option<String>,
    pub company_website: Option<String>,
    pub raw_payload: Json,
    pub score: f64,
    pub persona: Persona,
    pub scoring_metadata: Json,
}

/// Step 1 of the scorer: existence check used for idempotence against
/// redelivery of `leads.raw`.
pub async fn find_by_external_id(pool: &PgPool, external_id: &str) -> Result<Option<Lead>, DbError> {
    let row = sqlx::query_as::<_, LeadRow>("SELECT * FROM leads WHERE external_id = $1")
        .bind(external_id)
        .fetch_optional(pool)
        .await?;
    row.map(LeadRow::into_entity).transpose()
}

/// Inserts a freshly scored Lead row within the caller's transaction, so
/// the scorer can roll back if the subsequent `leads.scored` emit fails
/// (§4.5).
pub async fn insert_scored(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewScoredLead,
) -> Result<Lead, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as::<_, LeadRow>(
        r#"
        INSERT INTO leads (
            id, external_id, contact_name, contact_email, contact_title,
            company_name, company_industry, company_size_bucket, company_website,
            raw_payload, score, persona, status, scoring_metadata,
            created_at, scored_at, updated_at
        ) VALUES (
            $1, $2, $3, $4, $5,
            $6, $7, $8, $9,
            $10, $11, $12, 'scored', $13,
            $14, $14, $14
        )
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&new.external_id)
    .bind(&new.contact_name)
    .bind(&new.contact_email)
    .bind(&new.contact_title)
    .bind(&new.company_name)
    .bind(&new.company_industry)
    .bind(&new.company_size_bucket)
    .bind(&new.company_website)
    .bind(&new.raw_payload)
    .bind(new.score)
    .bind(new.persona.to_string())
    .bind(&new.scoring_metadata)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;

    row.into_entity()
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Lead>, DbError> {
    let row = sqlx::query_as::<_, LeadRow>("SELECT * FROM leads WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(LeadRow::into_entity).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_converts_persona_and_status() {
        let row = LeadRow {
            id: Uuid::new_v4(),
            external_id: "ext-1".into(),
            contact_name: None,
            contact_email: None,
            contact_title: None,
            company_name: None,
            company_industry: None,
            company_size_bucket: None,
            company_website: None,
            raw_payload: Json::Null,
            score: Some(0.9),
            persona: "Mid-Market".into(),
            status: "scored".into(),
            assigned_experiment_id: None,
            outreach_count: 0,
            response_count: 0,
            scoring_metadata: None,
            created_at: Utc::now(),
            scored_at: Some(Utc::now()),
            contacted_at: None,
            updated_at: Utc::now(),
        };
        let lead = row.into_entity().unwrap();
        assert_eq!(lead.persona, Persona::Smb);
        assert_eq!(lead.status, LeadStatus::Scored);
    }

    #[test]
    fn row_rejects_unknown_status() {
        let row = LeadRow {
            id: Uuid::new_v4(),
            external_id: "ext-1".into(),
            contact_name: None,
            contact_email: None,
            contact_title: None,
            company_name: None,
            company_industry: None,
            company_size_bucket: None,
            company_website: None,
            raw_payload: Json::Null,
            score: None,
            persona: "unknown".into(),
            status: "bogus".into(),
            assigned_experiment_id: None,
            outreach_count: 0,
            response_count: 0,
            scoring_metadata: None,
            created_at: Utc::now(),
            scored_at: None,
            contacted_at: None,
            updated_at: Utc::now(),
        };
        assert!(row.into_entity().is_err());
    }
}
