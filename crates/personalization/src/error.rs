use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersonalizationError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rewrite api error status={status}: {body}")]
    Api { status: u16, body: String },
}
