use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("commit error: {0}")]
    Commit(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),
}
