//! Post-commit fan-out to viewers
//!
//! Publishing happens after the mutation is durable and never feeds back
//! into it: a failed or slow publish is logged and dropped. Viewers that
//! miss an update recover by re-fetching the match.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::types::Match;

/// Full match projection, sent to the match channel and the dashboard
pub const MATCH_UPDATE: &str = "match:update";

/// `{ "message": ... }`, sent to the match channel only
pub const MATCH_ANNOUNCEMENT: &str = "match:announcement";

pub const DASHBOARD_CHANNEL: &str = "dashboard";

pub fn match_channel(match_id: &str) -> String {
    format!("match:{}", match_id)
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("channel {0} is closed")]
    Closed(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("publish failed: {0}")]
    Transport(String),
}

/// Injected publish seam
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn publish(&self, channel: &str, event: &str, payload: Value) -> Result<(), PublishError>;
}

/// Bounded, fire-and-forget publisher for committed mutations
#[derive(Clone)]
pub struct BroadcastDispatcher {
    pubsub: Arc<dyn PubSub>,
    timeout: Duration,
}

impl BroadcastDispatcher {
    pub fn new(pubsub: Arc<dyn PubSub>, timeout: Duration) -> Self {
        Self { pubsub, timeout }
    }

    /// Publish the full projection to the match channel and the dashboard
    pub async fn match_updated(&self, m: &Match) {
        let payload = match serde_json::to_value(m.projection()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(match_id = %m.id, error = %e, "Failed to encode match projection");
                return;
            }
        };

        self.send(&match_channel(&m.id), MATCH_UPDATE, payload.clone()).await;
        self.send(DASHBOARD_CHANNEL, MATCH_UPDATE, payload).await;
    }

    pub async fn announcement(&self, match_id: &str, message: &str) {
        self.send(
            &match_channel(match_id),
            MATCH_ANNOUNCEMENT,
            json!({ "message": message }),
        )
        .await;
    }

    async fn send(&self, channel: &str, event: &str, payload: Value) {
        match tokio::time::timeout(self.timeout, self.pubsub.publish(channel, event, payload)).await {
            Ok(Ok(())) => debug!(channel, event, "Published"),
            Ok(Err(e)) => warn!(channel, event, error = %e, "Publish failed"),
            Err(_) => warn!(
                channel,
                event,
                timeout_ms = self.timeout.as_millis() as u64,
                "Publish timed out"
            ),
        }
    }
}
