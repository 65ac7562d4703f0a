use pipeline_core::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::error::DbError;

/// Build a connection pool and run pending migrations.
///
/// `backend = "embedded"` still targets Postgres (a single-connection pool
/// against a local instance) — no separate embedded-database engine is
/// wired in, since nothing else in this codebase's stack pulls one in.
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    if !config.is_configured() {
        return Err(DbError::NotConfigured);
    }

    let max_connections = if config.backend == "embedded" {
        1
    } else {
        config.max_connections
    };

    info!(url = %config.masked_connection_string(), max_connections, "connecting to database");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&config.connection_string())
        .await?;

    info!("running pending migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
