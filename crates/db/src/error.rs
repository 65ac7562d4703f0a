use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database not configured")]
    NotConfigured,
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("row decode error: {0}")]
    Decode(String),
}
