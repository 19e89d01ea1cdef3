//! Common types used throughout the duel service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::current_timestamp;

/// Transport-assigned identifier for a connected player
pub type PlayerId = String;

/// Unique identifier for sessions
pub type SessionId = Uuid;

/// Lifetime statistics for a connected player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub games_played: u32,
    pub wins: u32,
    pub total_time_ms: u64,
}

/// A connected participant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub connected_at: DateTime<Utc>,
    pub stats: PlayerStats,
    /// Reserved flag set by `mark-ready`; never consulted before a match starts
    pub ready: bool,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            connected_at: current_timestamp(),
            stats: PlayerStats::default(),
            ready: false,
        }
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Active,
    Finished,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Finished => write!(f, "finished"),
        }
    }
}

/// Why a session finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Timeout,
    Disconnect,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::Timeout => "timeout",
            EndReason::Disconnect => "disconnect",
        }
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final telemetry of one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub peak_intensity: f64,
    pub average_intensity: f64,
    pub last_intensity: f64,
    pub sample_count: u64,
}

/// Immutable result of a finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub winner_id: Option<PlayerId>,
    pub per_player_summary: Vec<PlayerSummary>,
    pub duration_ms: u64,
    pub reason: EndReason,
}

/// Aggregate counters exposed by the read-only statistics surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArenaStats {
    pub total_sessions: u64,
    pub total_connections: u64,
    pub peak_players: usize,
    pub current_players: usize,
    pub queue_length: usize,
    pub active_sessions: usize,
    pub uptime_seconds: u64,
}
