//! Request/response shapes for the delivery adapter (§4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
    pub tracking_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SendResult {
    pub status: SendStatus,
    pub message_id: Option<String>,
    pub provider: String,
    pub sent_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl SendResult {
    pub fn sent(message_id: String, provider: &str) -> Self {
        Self {
            status: SendStatus::Sent,
            message_id: Some(message_id),
            provider: provider.to_string(),
            sent_at: Utc::now(),
            error: None,
        }
    }

    pub fn failed(provider: &str, error: impl Into<String>) -> Self {
        Self {
            status: SendStatus::Failed,
            message_id: None,
            provider: provider.to_string(),
            sent_at: Utc::now(),
            error: Some(error.into()),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == SendStatus::Sent
    }
}
