//! Experiment (bandit arm) accessors (§3, §4.6, §4.7). Counter mutations go
//! through row-level `UPDATE ... SET x = x + 1` statements rather than
//! read-modify-write, per the concurrency note in §5, to avoid lost updates
//! when multiple orchestrator/feedback instances touch the same arm.

use chrono::Utc;
use serde_json::Value as Json;
use sqlx::{PgPool, Postgres, Transaction};

use pipeline_core::model::Experiment;

use crate::error::DbError;

#[derive(Debug, sqlx::FromRow)]
pub struct ExperimentRow {
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
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<ExperimentRow> for Experiment {
    fn from(row: ExperimentRow) -> Self {
        Experiment {
            experiment_id: row.experiment_id,
            name: row.name,
            variant: row.variant,
            config: row.config,
            alpha: row.alpha,
            beta: row.beta,
            leads_assigned: row.leads_assigned,
            outreach_sent: row.outreach_sent,
            responses_received: row.responses_received,
            conversions: row.conversions,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// All active arms, for Thompson Sampling selection (§4.6 step 3). Ordered
/// by `experiment_id` so iteration order (and tie-breaking) is stable.
pub async fn list_active(pool: &PgPool) -> Result<Vec<Experiment>, DbError> {
    let rows = sqlx::query_as::<_, ExperimentRow>(
        "SELECT * FROM experiments WHERE is_active = TRUE ORDER BY experiment_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Experiment::from).collect())
}

pub async fn find(pool: &PgPool, experiment_id: &str) -> Result<Option<Experiment>, DbError> {
    let row = sqlx::query_as::<_, ExperimentRow>("SELECT * FROM experiments WHERE experiment_id = $1")
        .bind(experiment_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Experiment::from))
}

/// Bumps `leads_assigned` and `outreach_sent` by one, inside the caller's
/// transaction (§4.6 step 7).
pub async fn record_outreach_sent(
    tx: &mut Transaction<'_, Postgres>,
    experiment_id: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE experiments SET leads_assigned = leads_assigned + 1, \
         outreach_sent = outreach_sent + 1, updated_at = now() WHERE experiment_id = $1",
    )
    .bind(experiment_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Bumps `responses_received` by one (§4.7, `outreach.replied`).
pub async fn record_response(
    tx: &mut Transaction<'_, Postgres>,
    experiment_id: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE experiments SET responses_received = responses_received + 1, \
         updated_at = now() WHERE experiment_id = $1",
    )
    .bind(experiment_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Bumps `conversions` by one and increments the Beta `alpha` prior
/// (§4.7, `outreach.converted`). No `beta` increment here — see the
/// design notes on the beta-posterior ambiguity.
pub async fn record_conversion(
    tx: &mut Transaction<'_, Postgres>,
    experiment_id: &str,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE experiments SET conversions = conversions + 1, alpha = alpha + 1, \
         updated_at = now() WHERE experiment_id = $1",
    )
    .bind(experiment_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Applies the §9-resolved beta-timeout policy: increments `beta` once for
/// a lead that replied but never converted within `conversion_window_days`.
/// Only called when that window is configured (non-zero); dedup rides on
/// `processed_feedback_events` since there is no lead-status edge to guard
/// this on (a lead can stay `responded` indefinitely).
pub async fn record_beta_timeout(
    tx: &mut Transaction<'_, Postgres>,
    experiment_id: &str,
) -> Result<(), DbError> {
    sqlx::query("UPDATE experiments SET beta = beta + 1, updated_at = now() WHERE experiment_id = $1")
        .bind(experiment_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
