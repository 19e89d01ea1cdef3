//! Wire message definitions and serialization
//!
//! Every frame is a JSON object `{"type": "<kind>", "payload": {...}}`. The set of
//! kinds is closed in both directions.

use crate::error::{ArenaError, Result};
use crate::types::{PlayerId, PlayerStats, SessionId, SessionOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages a connected client may send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    JoinQueue,
    LeaveQueue,
    MarkReady,
    /// The value is kept raw so non-numeric input can be dropped without
    /// failing the whole frame
    IntensitySample {
        #[serde(default)]
        value: Value,
    },
    Heartbeat {
        #[serde(default)]
        timestamp: Value,
    },
    GetStats,
    ChatMessage { message: String },
}

impl ClientMessage {
    /// Short name used in logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::JoinQueue => "join-queue",
            ClientMessage::LeaveQueue => "leave-queue",
            ClientMessage::MarkReady => "mark-ready",
            ClientMessage::IntensitySample { .. } => "intensity-sample",
            ClientMessage::Heartbeat { .. } => "heartbeat",
            ClientMessage::GetStats => "get-stats",
            ClientMessage::ChatMessage { .. } => "chat-message",
        }
    }
}

/// Messages the server sends to a connected client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    ConnectionAck {
        player_id: PlayerId,
        server_time: i64,
    },
    QueuePosition {
        position: usize,
    },
    QueueLeft {},
    SessionSetup,
    SessionStart {
        session_id: SessionId,
        duration_ms: u64,
        start_time: i64,
        your_id: PlayerId,
        opponent_id: PlayerId,
    },
    OpponentIntensity {
        from_player_id: PlayerId,
        value: f64,
        timestamp: i64,
    },
    SessionEnd(SessionOutcome),
    OpponentLeft {
        message: String,
    },
    PlayerStats(PlayerStats),
    HeartbeatAck {
        timestamp: Value,
    },
    ChatMessage {
        from_player_id: PlayerId,
        message: String,
        timestamp: i64,
    },
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::ConnectionAck { .. } => "connection-ack",
            ServerEvent::QueuePosition { .. } => "queue-position",
            ServerEvent::QueueLeft {} => "queue-left",
            ServerEvent::SessionSetup => "session-setup",
            ServerEvent::SessionStart { .. } => "session-start",
            ServerEvent::OpponentIntensity { .. } => "opponent-intensity",
            ServerEvent::SessionEnd(_) => "session-end",
            ServerEvent::OpponentLeft { .. } => "opponent-left",
            ServerEvent::PlayerStats(_) => "player-stats",
            ServerEvent::HeartbeatAck { .. } => "heartbeat-ack",
            ServerEvent::ChatMessage { .. } => "chat-message",
        }
    }

    /// Streamed events that may be shed when the receiver falls behind.
    /// Everything else is part of the session lifecycle and must arrive.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            ServerEvent::OpponentIntensity { .. } | ServerEvent::ChatMessage { .. }
        )
    }
}

/// Kinds whose payload fields all have defaults, so the payload may be omitted
const OPTIONAL_PAYLOAD_KINDS: [&str; 2] = ["heartbeat", "intensity-sample"];

/// Message serialization and validation utilities
pub struct MessageUtils;

impl MessageUtils {
    /// Deserialize a client frame
    pub fn parse_client_message(text: &str) -> Result<ClientMessage> {
        let invalid = |e: serde_json::Error| -> anyhow::Error {
            ArenaError::InvalidMessage {
                reason: format!("Failed to deserialize client message: {}", e),
            }
            .into()
        };

        let mut frame: Value = serde_json::from_str(text).map_err(invalid)?;
        if let Value::Object(fields) = &mut frame {
            let defaultable = fields
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|kind| OPTIONAL_PAYLOAD_KINDS.contains(&kind));
            if defaultable && !fields.contains_key("payload") {
                fields.insert("payload".to_string(), Value::Object(serde_json::Map::new()));
            }
        }
        serde_json::from_value(frame).map_err(invalid)
    }

    /// Serialize a server event to a JSON text frame
    pub fn serialize_event(event: &ServerEvent) -> Result<String> {
        serde_json::to_string(event).map_err(|e| {
            ArenaError::InternalError {
                message: format!("Failed to serialize event: {}", e),
            }
            .into()
        })
    }

    /// Extract a numeric intensity from a raw payload value.
    ///
    /// Range checking happens later; this only rejects values that are not
    /// JSON numbers at all.
    pub fn intensity_value(raw: &Value) -> Option<f64> {
        match raw {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}
