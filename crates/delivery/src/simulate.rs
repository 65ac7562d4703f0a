//! Simulation mode (§4.4): used when credentials are absent or simulation
//! is explicitly enabled. Never fails, always returns a synthetic
//! message id, and logs the simulated send so it's visible in worker
//! output without a live provider.

use tracing::info;
use uuid::Uuid;

use crate::types::{SendRequest, SendResult};

pub fn simulate_send(req: &SendRequest) -> SendResult {
    let message_id = format!("sim-{}", Uuid::new_v4());
    info!(
        to = %req.to_email,
        tracking_id = %req.tracking_id,
        message_id = %message_id,
        "simulated send (no live delivery provider configured)"
    );
    SendResult::sent(message_id, "simulate")
}
