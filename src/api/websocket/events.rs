//! WebSocket message types for live match feeds

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Published message with delivery metadata
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsMessage {
    /// `match:update` or `match:announcement`
    pub event: String,

    pub channel: String,

    pub payload: Value,

    /// Monotonically increasing across all channels, for gap detection
    pub sequence_id: u64,

    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

/// Client message types
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ping for heartbeat
    Ping,
}

/// Welcome message sent on connection
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub channel: String,
    pub current_sequence_id: u64,
}

impl WelcomeMessage {
    pub fn new(channel: impl Into<String>, current_sequence_id: u64) -> Self {
        Self {
            msg_type: "connected".to_string(),
            channel: channel.into(),
            current_sequence_id,
        }
    }
}

/// Pong response message
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PongMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
}

impl Default for PongMessage {
    fn default() -> Self {
        Self {
            msg_type: "pong".to_string(),
        }
    }
}

/// Sent when a slow client dropped messages and must re-fetch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LaggedMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub code: String,
    pub message: String,
}

impl LaggedMessage {
    pub fn new(missed: u64) -> Self {
        Self {
            msg_type: "error".to_string(),
            code: "lagged".to_string(),
            message: format!("Missed {} events, please re-fetch the match", missed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_message_serialization() {
        let msg = WsMessage {
            event: "match:update".to_string(),
            channel: "match:m1".to_string(),
            payload: serde_json::json!({ "id": "m1" }),
            sequence_id: 42,
            timestamp: 1234567890,
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"sequenceId\":42"));
        assert!(json.contains("\"event\":\"match:update\""));
    }

    #[test]
    fn test_client_message_parsing() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
    }

    #[test]
    fn test_welcome_shape() {
        let json = serde_json::to_value(WelcomeMessage::new("dashboard", 7)).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["currentSequenceId"], 7);
    }
}
