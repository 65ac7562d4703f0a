use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error status={status}: {body}")]
    Api { status: u16, body: String },

    #[error("not configured")]
    NotConfigured,
}
