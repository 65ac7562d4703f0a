//! Transactional multi-row updates (§4.2). Each function here either
//! commits or rolls back as a unit, so the outreach log can never diverge
//! from the lead/experiment counters it's supposed to move in lockstep
//! with. Callers must not commit the triggering event's offset until the
//! function returns `Ok`.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use pipeline_core::entity::Channel;
use pipeline_core::model::OutreachLog;

use crate::error::DbError;
use crate::repo::experiments;

/// §4.6 step 7: on a successful send, insert the `sent` OutreachLog and
/// transition the Lead and Experiment counters in one transaction.
pub async fn record_successful_outreach(
    pool: &PgPool,
    lead_id: Uuid,
    experiment_id: &str,
    template_id: &str,
    subject: &str,
    body: &str,
    channel: Channel,
    sent_via: &str,
    external_message_id: &str,
) -> Result<OutreachLog, DbError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let log_id = Uuid::new_v4();

    let log = sqlx::query_as::<_, crate::repo::outreach_logs::OutreachLogRow>(
        r#"
        INSERT INTO outreach_logs (
            id, lead_id, experiment_id, template_id, subject, body,
            channel, sent_via, external_message_id, status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'sent', $10, $10)
        RETURNING *
        "#,
    )
    .bind(log_id)
    .bind(lead_id)
    .bind(experiment_id)
    .bind(template_id)
    .bind(subject)
    .bind(body)
    .bind(channel.to_string())
    .bind(sent_via)
    .bind(external_message_id)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE leads SET status = 'contacted', assigned_experiment_id = $2, \
         contacted_at = $3, outreach_count = outreach_count + 1, updated_at = $3 \
         WHERE id = $1",
    )
    .bind(lead_id)
    .bind(experiment_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    experiments::record_outreach_sent(&mut tx, experiment_id).await?;

    tx.commit().await?;
    log.into_entity()
}

/// §4.6 step 6: a failed delivery attempt is logged but does not move the
/// lead or experiment. A single-row insert, not a multi-table transaction,
/// since nothing else changes state.
pub async fn record_failed_outreach(
    pool: &PgPool,
    lead_id: Uuid,
    experiment_id: &str,
    template_id: &str,
    subject: &str,
    body: &str,
    channel: Channel,
    sent_via: &str,
    error: &str,
) -> Result<OutreachLog, DbError> {
    let now = Utc::now();
    let log_id = Uuid::new_v4();

    let log = sqlx::query_as::<_, crate::repo::outreach_logs::OutreachLogRow>(
        r#"
        INSERT INTO outreach_logs (
            id, lead_id, experiment_id, template_id, subject, body,
            channel, sent_via, status, error, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'failed', $9, $10, $10)
        RETURNING *
        "#,
    )
    .bind(log_id)
    .bind(lead_id)
    .bind(experiment_id)
    .bind(template_id)
    .bind(subject)
    .bind(body)
    .bind(channel.to_string())
    .bind(sent_via)
    .bind(error)
    .bind(now)
    .fetch_one(pool)
    .await?;

    log.into_entity()
}

/// §4.7 `outreach.opened`: OutreachLog `sent -> opened`, no lead/experiment
/// change.
pub async fn apply_opened(pool: &PgPool, log_id: Uuid) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE outreach_logs SET status = 'opened', opened_at = now(), updated_at = now() \
         WHERE id = $1 AND status != 'opened'",
    )
    .bind(log_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// §4.7 `outreach.clicked`: OutreachLog `* -> clicked`, no lead/experiment
/// change.
pub async fn apply_clicked(pool: &PgPool, log_id: Uuid) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE outreach_logs SET status = 'clicked', clicked_at = now(), updated_at = now() \
         WHERE id = $1 AND status != 'clicked'",
    )
    .bind(log_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// §4.7 `outreach.replied`: OutreachLog `* -> replied`, Lead `-> responded`
/// with `response_count += 1`, Experiment `responses_received += 1`. All
/// in one transaction.
///
/// The lead update is gated `WHERE status = 'contacted'` so a redelivered
/// `outreach.replied` (the pipeline is at-least-once, up to
/// `max_delivery_attempts` before the dead letter) finds the lead already
/// `responded` and touches zero rows. `record_response` is only called when
/// the lead update actually applied, mirroring `apply_converted`'s guard, so
/// `responses_received` can't outrun `response_count` on redelivery.
///
/// Returns `true` if this was the lead's first reply, `false` if it was
/// already `responded` and this event is a no-op redelivery.
pub async fn apply_replied(
    pool: &PgPool,
    log_id: Uuid,
    lead_id: Uuid,
    experiment_id: &str,
) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE outreach_logs SET status = 'replied', replied_at = now(), updated_at = now() \
         WHERE id = $1",
    )
    .bind(log_id)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query(
        "UPDATE leads SET status = 'responded', response_count = response_count + 1, \
         updated_at = now() WHERE id = $1 AND status = 'contacted'",
    )
    .bind(lead_id)
    .execute(&mut *tx)
    .await?;

    let applied = result.rows_affected() > 0;
    if applied {
        experiments::record_response(&mut tx, experiment_id).await?;
    }

    tx.commit().await?;
    Ok(applied)
}

/// §4.7 `outreach.converted`: Lead `-> converted`, Experiment
/// `conversions += 1, alpha += 1`. The `WHERE status != 'converted'` guard
/// is the at-most-once mechanism for redelivered conversion events (§8,
/// §9) — a redelivery finds zero rows affected on the lead update and the
/// caller skips the experiment mutation entirely.
///
/// Returns `true` if the conversion was newly applied (so the caller knows
/// whether to touch the experiment), `false` if the lead was already
/// converted and this event is a no-op redelivery.
pub async fn apply_converted(
    pool: &PgPool,
    lead_id: Uuid,
    experiment_id: &str,
) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE leads SET status = 'converted', updated_at = now() \
         WHERE id = $1 AND status != 'converted'",
    )
    .bind(lead_id)
    .execute(&mut *tx)
    .await?;

    let applied = result.rows_affected() > 0;
    if applied {
        experiments::record_conversion(&mut tx, experiment_id).await?;
    }

    tx.commit().await?;
    Ok(applied)
}

/// The §9-resolved beta-timeout policy, guarded by the processed-events
/// ledger since there's no lead-status edge to hang this on (a lead can
/// stay `responded` indefinitely without converting).
pub async fn apply_beta_timeout_once(
    pool: &PgPool,
    external_id: &str,
    experiment_id: &str,
) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO processed_feedback_events (external_id, event_type) \
         VALUES ($1, 'beta_timeout') ON CONFLICT DO NOTHING",
    )
    .bind(external_id)
    .execute(&mut *tx)
    .await?;

    let applied = result.rows_affected() > 0;
    if applied {
        experiments::record_beta_timeout(&mut tx, experiment_id).await?;
    }

    tx.commit().await?;
    Ok(applied)
}
