//! In-process pub/sub hub backing the WebSocket and SSE feeds

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;

use super::events::WsMessage;
use crate::scoring::{PubSub, PublishError, DASHBOARD_CHANNEL};
use crate::types::is_valid_match_id;
use crate::utils::current_timestamp_millis;

/// Named broadcast channels, created on first subscription
///
/// If a client falls more than `capacity` messages behind it receives a
/// lag notice instead and is expected to re-fetch.
pub struct ChannelHub {
    channels: RwLock<HashMap<String, broadcast::Sender<WsMessage>>>,
    capacity: usize,
    sequence_counter: AtomicU64,
}

impl ChannelHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            sequence_counter: AtomicU64::new(0),
        }
    }

    /// `dashboard` or `match:<id>`
    pub fn is_valid_channel(channel: &str) -> bool {
        channel == DASHBOARD_CHANNEL
            || channel
                .strip_prefix("match:")
                .is_some_and(is_valid_match_id)
    }

    /// Follow `channel`; channels nobody follows any more are pruned first
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<WsMessage> {
        if let Some(tx) = self.channels.read().get(channel) {
            return tx.subscribe();
        }
        let mut channels = self.channels.write();
        channels.retain(|name, tx| name == channel || tx.receiver_count() > 0);
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drop `channel` once its last receiver is gone
    pub fn release(&self, channel: &str) {
        let mut channels = self.channels.write();
        if channels.get(channel).is_some_and(|tx| tx.receiver_count() == 0) {
            channels.remove(channel);
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Send to current subscribers; returns the assigned sequence id
    pub fn broadcast(&self, channel: &str, event: &str, payload: Value) -> u64 {
        let sequence_id = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        let msg = WsMessage {
            event: event.to_string(),
            channel: channel.to_string(),
            payload,
            sequence_id,
            timestamp: current_timestamp_millis(),
        };

        let mut channels = self.channels.write();
        if let Some(tx) = channels.get(channel) {
            // A send error only means every subscriber has gone away.
            if tx.send(msg).is_err() {
                channels.remove(channel);
            }
        }
        sequence_id
    }

    pub fn current_sequence_id(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .get(channel)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PubSub for ChannelHub {
    async fn publish(&self, channel: &str, event: &str, payload: Value) -> Result<(), PublishError> {
        self.broadcast(channel, event, payload);
        Ok(())
    }
}
