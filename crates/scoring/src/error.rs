use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error status={status}: {body}")]
    Api { status: u16, body: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("not configured")]
    NotConfigured,
}
