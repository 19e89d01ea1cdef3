//! Session record and lifecycle transitions
//!
//! A session is a two-player contest. It moves `pending -> active -> finished`
//! and never back; every transition is guarded so a second trigger is a no-op.

use crate::error::{ArenaError, Result};
use crate::types::{PlayerId, PlayerSummary, SessionId, SessionStatus};
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Running telemetry for one participant
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerTelemetry {
    pub last_intensity: f64,
    pub last_intensity_at: Option<i64>,
    pub peak_intensity: f64,
    pub total_intensity: f64,
    pub sample_count: u64,
}

impl PlayerTelemetry {
    /// Fold an already validated sample in
    pub fn record(&mut self, value: f64, timestamp: i64) {
        self.last_intensity = value;
        self.last_intensity_at = Some(timestamp);
        self.sample_count += 1;
        self.total_intensity += value;
        self.peak_intensity = self.peak_intensity.max(value);
    }

    pub fn average_intensity(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.total_intensity / self.sample_count as f64
        }
    }

    fn summary(&self, player_id: &str) -> PlayerSummary {
        PlayerSummary {
            player_id: player_id.to_string(),
            peak_intensity: self.peak_intensity,
            average_intensity: self.average_intensity(),
            last_intensity: self.last_intensity,
            sample_count: self.sample_count,
        }
    }
}

/// A paired contest between exactly two distinct players
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    participants: [PlayerId; 2],
    telemetry: [PlayerTelemetry; 2],
    status: SessionStatus,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    start_time_ms: i64,
    duration_ms: u64,
    last_activity_at: i64,
    timer: Option<AbortHandle>,
}

impl Session {
    /// Create a pending session. The participants must differ.
    pub fn new(id: SessionId, first: PlayerId, second: PlayerId) -> Result<Self> {
        if first == second {
            return Err(ArenaError::InternalError {
                message: format!("Session {} needs two distinct players, got '{}'", id, first),
            }
            .into());
        }

        Ok(Self {
            id,
            participants: [first, second],
            telemetry: Default::default(),
            status: SessionStatus::Pending,
            started_at: None,
            ended_at: None,
            start_time_ms: 0,
            duration_ms: 0,
            last_activity_at: 0,
            timer: None,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    pub fn is_finished(&self) -> bool {
        self.status == SessionStatus::Finished
    }

    pub fn participants(&self) -> &[PlayerId; 2] {
        &self.participants
    }

    pub fn is_participant(&self, player_id: &str) -> bool {
        self.slot(player_id).is_some()
    }

    fn slot(&self, player_id: &str) -> Option<usize> {
        self.participants.iter().position(|id| id == player_id)
    }

    /// The other participant, if `player_id` is one
    pub fn opponent_of(&self, player_id: &str) -> Option<&PlayerId> {
        self.slot(player_id).map(|idx| &self.participants[1 - idx])
    }

    pub fn telemetry(&self, player_id: &str) -> Option<&PlayerTelemetry> {
        self.slot(player_id).map(|idx| &self.telemetry[idx])
    }

    /// Mutable telemetry, only while the session is active
    pub fn telemetry_mut(&mut self, player_id: &str) -> Option<&mut PlayerTelemetry> {
        if !self.is_active() {
            return None;
        }
        let idx = self.slot(player_id)?;
        Some(&mut self.telemetry[idx])
    }

    pub fn peak_intensity(&self, player_id: &str) -> Option<f64> {
        self.telemetry(player_id).map(|t| t.peak_intensity)
    }

    /// Wall clock start time in epoch milliseconds
    pub fn start_time_ms(&self) -> i64 {
        self.start_time_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn last_activity_at(&self) -> i64 {
        self.last_activity_at
    }

    pub fn touch(&mut self, timestamp: i64) {
        self.last_activity_at = timestamp;
    }

    /// `pending -> active`
    pub fn activate(&mut self, now: Instant, wall_clock_ms: i64) -> Result<()> {
        if self.status != SessionStatus::Pending {
            return Err(ArenaError::InternalError {
                message: format!(
                    "Session {} cannot start from state {}",
                    self.id, self.status
                ),
            }
            .into());
        }

        self.status = SessionStatus::Active;
        self.started_at = Some(now);
        self.start_time_ms = wall_clock_ms;
        self.last_activity_at = wall_clock_ms;
        Ok(())
    }

    pub fn attach_timer(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.timer.replace(handle) {
            previous.abort();
        }
    }

    /// When the session finished, once it has
    pub fn ended_at(&self) -> Option<Instant> {
        self.ended_at
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// `active -> finished`. Cancels the duration timer and returns the
    /// elapsed time, or `None` if the session was not active.
    pub fn finish(&mut self, now: Instant) -> Option<u64> {
        if self.status != SessionStatus::Active {
            return None;
        }

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }

        self.status = SessionStatus::Finished;
        self.ended_at = Some(now);
        self.duration_ms = self
            .started_at
            .map(|started| now.saturating_duration_since(started).as_millis() as u64)
            .unwrap_or(0);
        Some(self.duration_ms)
    }

    /// Per-player summaries in participant order
    pub fn summaries(&self) -> Vec<PlayerSummary> {
        self.participants
            .iter()
            .zip(self.telemetry.iter())
            .map(|(id, telemetry)| telemetry.summary(id))
            .collect()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
