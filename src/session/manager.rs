//! Session manager owning the connection, queue and session tables
//!
//! All mutation goes through `&mut self`, so one owner (the arena engine task)
//! serialises every inbound event and timer callback. Timers never touch the
//! tables themselves; they post a `TimerEvent` back to that owner.

use crate::config::ArenaSettings;
use crate::connection::{ConnectionRegistry, Outbox};
use crate::error::{ArenaError, Result};
use crate::matchmaking::{EnqueueResult, MatchQueue};
use crate::metrics::MetricsCollector;
use crate::protocol::{ClientMessage, MessageUtils, ServerEvent};
use crate::session::instance::Session;
use crate::session::outcome::OutcomeResolver;
use crate::session::relay::TelemetryRelay;
use crate::types::{
    ArenaStats, EndReason, Player, PlayerId, PlayerStats, SessionId, SessionOutcome,
};
use crate::utils::{
    current_timestamp_millis, generate_session_id, is_valid_intensity, sanitize_chat,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Deferred work posted back to the owner of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The fixed contest duration of a session elapsed
    DurationElapsed(SessionId),
    /// The grace period after a session finished elapsed
    CleanupDue(SessionId),
}

/// Result of a join-queue request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinResult {
    /// Waiting at this 1-based position
    Queued { position: usize },
    /// Paired; the session is already active
    Matched { session_id: SessionId },
    /// Already playing in a non-finished session; nothing changed
    Busy { session_id: SessionId },
}

/// Owns every table of the arena
pub struct SessionManager {
    settings: ArenaSettings,
    registry: ConnectionRegistry,
    queue: MatchQueue,
    sessions: HashMap<SessionId, Session>,
    /// Latest session of each player, kept until that session is cleaned up
    player_sessions: HashMap<PlayerId, SessionId>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    metrics: Arc<MetricsCollector>,
    sessions_created: u64,
    started_at: Instant,
}

impl SessionManager {
    /// Create a manager that posts timer events to `timer_tx`
    pub fn new(settings: ArenaSettings, timer_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self::with_metrics(settings, timer_tx, Arc::new(MetricsCollector::default()))
    }

    /// Create a manager with an explicit metrics collector
    pub fn with_metrics(
        settings: ArenaSettings,
        timer_tx: mpsc::UnboundedSender<TimerEvent>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            settings,
            registry: ConnectionRegistry::new(),
            queue: MatchQueue::new(),
            sessions: HashMap::new(),
            player_sessions: HashMap::new(),
            timer_tx,
            metrics,
            sessions_created: 0,
            started_at: Instant::now(),
        }
    }

    pub fn settings(&self) -> &ArenaSettings {
        &self.settings
    }

    // ---- connections ----------------------------------------------------

    /// Register a new connection and acknowledge it
    pub fn register(&mut self, player_id: &str, outbox: Outbox) -> Result<Player> {
        let player = self.registry.register(player_id, outbox)?;

        self.registry.send(
            player_id,
            ServerEvent::ConnectionAck {
                player_id: player_id.to_string(),
                server_time: current_timestamp_millis(),
            },
        );
        self.metrics.record_player_connected(self.registry.len());
        Ok(player)
    }

    /// Tear a connection down. Queue removal, disconnect handling and the
    /// registry removal happen in this one call.
    pub fn unregister(&mut self, player_id: &str) -> bool {
        if !self.registry.contains(player_id) {
            debug!("Unregister for unknown player '{}' ignored", player_id);
            return false;
        }

        if self.queue.remove(player_id) {
            self.metrics.set_queue_length(self.queue.len());
        }
        self.handle_disconnect(player_id);
        self.player_sessions.remove(player_id);
        self.registry.remove(player_id);

        self.metrics.record_player_disconnected(self.registry.len());
        true
    }

    /// Disconnect every player whose outbox overflowed on a lifecycle event.
    /// Evictions can stall further players, so this repeats until none are
    /// left. Returns the number of players removed.
    pub fn evict_stalled(&mut self) -> usize {
        let mut evicted = 0;
        loop {
            let stalled = self.registry.take_stalled();
            if stalled.is_empty() {
                return evicted;
            }
            for player_id in stalled {
                if self.unregister(&player_id) {
                    warn!("Evicted player '{}' with a stalled connection", player_id);
                    evicted += 1;
                }
            }
        }
    }

    // ---- queue ----------------------------------------------------------

    /// Put a player in the queue, creating a session once two are waiting
    pub fn join_queue(&mut self, player_id: &str) -> Result<JoinResult> {
        if !self.registry.contains(player_id) {
            return Err(ArenaError::PlayerNotFound {
                player_id: player_id.to_string(),
            }
            .into());
        }

        if let Some(session_id) = self.live_session_of(player_id) {
            debug!(
                "Player '{}' asked to queue while in session {}",
                player_id, session_id
            );
            return Ok(JoinResult::Busy { session_id });
        }

        let result = match self.queue.enqueue(player_id) {
            EnqueueResult::Waiting { position } => {
                self.registry
                    .send(player_id, ServerEvent::QueuePosition { position });
                info!(
                    "Player '{}' joined queue at position {}",
                    player_id, position
                );
                JoinResult::Queued { position }
            }
            EnqueueResult::Matched(first, second) => {
                let session_id = self.create_session(&first, &second)?;
                JoinResult::Matched { session_id }
            }
        };

        self.metrics.set_queue_length(self.queue.len());
        Ok(result)
    }

    /// Remove a player from the queue; absent players are not an error
    pub fn leave_queue(&mut self, player_id: &str) -> bool {
        let removed = self.queue.remove(player_id);
        if removed {
            info!(
                "Player '{}' left queue. Queue size: {}",
                player_id,
                self.queue.len()
            );
            self.metrics.set_queue_length(self.queue.len());
        }
        self.registry.send(player_id, ServerEvent::QueueLeft {});
        removed
    }

    // ---- sessions -------------------------------------------------------

    /// Pair two players: create the session, notify both, activate it and
    /// start its duration timer
    pub fn create_session(&mut self, first: &str, second: &str) -> Result<SessionId> {
        let session_id = generate_session_id();
        let mut session = Session::new(session_id, first.to_string(), second.to_string())?;

        for player_id in [first, second] {
            self.queue.remove(player_id);
            self.player_sessions
                .insert(player_id.to_string(), session_id);
            self.registry.send(player_id, ServerEvent::SessionSetup);
        }

        session.activate(Instant::now(), current_timestamp_millis())?;

        let duration_ms = self.settings.session_duration_ms;
        for (me, opponent) in [(first, second), (second, first)] {
            self.registry.send(
                me,
                ServerEvent::SessionStart {
                    session_id,
                    duration_ms,
                    start_time: session.start_time_ms(),
                    your_id: me.to_string(),
                    opponent_id: opponent.to_string(),
                },
            );
        }

        let timer = self.schedule(
            self.settings.session_duration(),
            TimerEvent::DurationElapsed(session_id),
        );
        session.attach_timer(timer);

        self.sessions.insert(session_id, session);
        self.sessions_created += 1;
        self.metrics.record_session_started(self.active_session_count());

        info!(
            "Session {} created: '{}' vs '{}' ({}ms)",
            session_id, first, second, duration_ms
        );
        Ok(session_id)
    }

    /// Apply a raw intensity payload from a player to their current session
    pub fn handle_intensity_sample(&mut self, player_id: &str, raw: &Value) -> bool {
        let Some(session_id) = self.player_sessions.get(player_id).copied() else {
            debug!("Sample from '{}' outside any session dropped", player_id);
            return false;
        };

        match MessageUtils::intensity_value(raw) {
            Some(value) => self.record_intensity(session_id, player_id, value),
            None => {
                debug!("Non-numeric sample from '{}' dropped", player_id);
                self.metrics.record_intensity_sample(false);
                false
            }
        }
    }

    /// Validate and relay one sample. Missing or inactive sessions,
    /// non-participants and out-of-range values are silently dropped.
    pub fn record_intensity(&mut self, session_id: SessionId, player_id: &str, value: f64) -> bool {
        let Some(session) = self.sessions.get_mut(&session_id) else {
            debug!("Sample for unknown session {} dropped", session_id);
            return false;
        };
        if !session.is_active() || !session.is_participant(player_id) {
            debug!(
                "Sample from '{}' for session {} ({}) dropped",
                player_id,
                session_id,
                session.status()
            );
            return false;
        }
        if !is_valid_intensity(value) {
            debug!("Out-of-range sample {} from '{}' dropped", value, player_id);
            self.metrics.record_intensity_sample(false);
            return false;
        }

        let accepted = TelemetryRelay::deliver(
            session,
            &mut self.registry,
            player_id,
            value,
            current_timestamp_millis(),
        );
        self.metrics.record_intensity_sample(accepted);
        accepted
    }

    /// Finish the player's active session in favour of the opponent
    pub fn handle_disconnect(&mut self, player_id: &str) -> Option<SessionOutcome> {
        let session_id = self.live_session_of(player_id)?;
        self.finalize_session(session_id, EndReason::Disconnect, Some(player_id))
    }

    /// Resolve a session and schedule its cleanup. Idempotent: returns
    /// `None` for sessions that are missing or no longer active.
    pub fn finalize_session(
        &mut self,
        session_id: SessionId,
        reason: EndReason,
        disconnected_id: Option<&str>,
    ) -> Option<SessionOutcome> {
        let session = self.sessions.get_mut(&session_id)?;
        let outcome = OutcomeResolver::finalize(
            session,
            &mut self.registry,
            reason,
            disconnected_id,
            Instant::now(),
        )?;

        self.schedule(
            self.settings.cleanup_grace(),
            TimerEvent::CleanupDue(session_id),
        );
        self.metrics.record_session_finished(
            reason,
            Duration::from_millis(outcome.duration_ms),
            self.active_session_count(),
        );
        Some(outcome)
    }

    /// Drop a finished session from every lookup table
    pub fn cleanup_session(&mut self, session_id: SessionId) -> bool {
        let Some(session) = self.sessions.remove(&session_id) else {
            return false;
        };

        if !session.is_finished() {
            warn!(
                "Cleanup of session {} in state {} refused",
                session_id,
                session.status()
            );
            self.sessions.insert(session_id, session);
            return false;
        }

        for participant in session.participants() {
            if self.player_sessions.get(participant) == Some(&session_id) {
                self.player_sessions.remove(participant);
            }
        }

        info!("Session {} cleaned up", session_id);
        true
    }

    /// Route a fired timer
    pub fn handle_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::DurationElapsed(session_id) => {
                let active = self
                    .sessions
                    .get(&session_id)
                    .is_some_and(Session::is_active);
                if active {
                    self.finalize_session(session_id, EndReason::Timeout, None);
                } else {
                    debug!("Duration timer for session {} is stale", session_id);
                }
            }
            TimerEvent::CleanupDue(session_id) => {
                self.cleanup_session(session_id);
            }
        }
    }

    fn schedule(&self, delay: Duration, event: TimerEvent) -> AbortHandle {
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // the owner may already be gone during shutdown
            let _ = timer_tx.send(event);
        })
        .abort_handle()
    }

    // ---- client messages ------------------------------------------------

    /// Dispatch one inbound client message
    pub fn handle_message(&mut self, player_id: &str, message: ClientMessage) -> Result<()> {
        if !self.registry.contains(player_id) {
            return Err(ArenaError::PlayerNotFound {
                player_id: player_id.to_string(),
            }
            .into());
        }

        match message {
            ClientMessage::JoinQueue => {
                self.join_queue(player_id)?;
            }
            ClientMessage::LeaveQueue => {
                self.leave_queue(player_id);
            }
            ClientMessage::MarkReady => {
                self.registry.set_ready(player_id);
                debug!("Player '{}' marked ready", player_id);
            }
            ClientMessage::IntensitySample { value } => {
                self.handle_intensity_sample(player_id, &value);
            }
            ClientMessage::Heartbeat { timestamp } => {
                self.registry
                    .send(player_id, ServerEvent::HeartbeatAck { timestamp });
            }
            ClientMessage::GetStats => {
                if let Some(stats) = self.registry.stats(player_id) {
                    self.registry
                        .send(player_id, ServerEvent::PlayerStats(stats));
                }
            }
            ClientMessage::ChatMessage { message } => {
                self.relay_chat(player_id, &message);
            }
        }
        Ok(())
    }

    /// Forward a chat line to the opponent of the player's current session
    pub fn relay_chat(&mut self, player_id: &str, message: &str) -> bool {
        let Some(session) = self
            .player_sessions
            .get(player_id)
            .and_then(|id| self.sessions.get(id))
        else {
            return false;
        };
        let Some(message) = sanitize_chat(message, self.settings.chat_max_length) else {
            return false;
        };

        TelemetryRelay::relay_chat(
            session,
            &mut self.registry,
            player_id,
            message,
            current_timestamp_millis(),
        )
    }

    // ---- queries --------------------------------------------------------

    /// Session id of the player's non-finished session, if any
    fn live_session_of(&self, player_id: &str) -> Option<SessionId> {
        let session_id = self.player_sessions.get(player_id)?;
        self.sessions
            .get(session_id)
            .filter(|s| !s.is_finished())
            .map(|s| s.id())
    }

    pub fn get_session(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// The player's latest session, finished or not, until it is cleaned up
    pub fn session_of(&self, player_id: &str) -> Option<&Session> {
        self.player_sessions
            .get(player_id)
            .and_then(|id| self.sessions.get(id))
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.registry.get(player_id)
    }

    pub fn player_stats(&self, player_id: &str) -> Option<PlayerStats> {
        self.registry.stats(player_id)
    }

    pub fn queue_position(&self, player_id: &str) -> Option<usize> {
        self.queue.position(player_id)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn player_count(&self) -> usize {
        self.registry.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_session_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_active()).count()
    }

    /// Aggregate counters for the statistics surface
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            total_sessions: self.sessions_created,
            total_connections: self.registry.total_connections(),
            peak_players: self.registry.peak_players(),
            current_players: self.registry.len(),
            queue_length: self.queue.len(),
            active_sessions: self.active_session_count(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Check the cross-table invariants. Used by tests and debug tooling.
    pub fn verify_invariants(&self) -> Result<()> {
        let fail = |message: String| -> Result<()> {
            Err(ArenaError::InternalError { message }.into())
        };

        let mut live_members: HashMap<&str, SessionId> = HashMap::new();
        for session in self.sessions.values().filter(|s| !s.is_finished()) {
            let [first, second] = session.participants();
            if first == second {
                return fail(format!("session {} pairs '{}' with itself", session.id(), first));
            }
            for participant in [first, second] {
                if let Some(other) = live_members.insert(participant.as_str(), session.id()) {
                    return fail(format!(
                        "player '{}' is in live sessions {} and {}",
                        participant,
                        other,
                        session.id()
                    ));
                }
                if self.queue.contains(participant) {
                    return fail(format!(
                        "player '{}' is queued while in session {}",
                        participant,
                        session.id()
                    ));
                }
            }
        }

        for (player_id, session_id) in &self.player_sessions {
            if !self.registry.contains(player_id) {
                return fail(format!("index holds disconnected player '{}'", player_id));
            }
            match self.sessions.get(session_id) {
                Some(session) if session.is_participant(player_id) => {}
                _ => {
                    return fail(format!(
                        "index maps '{}' to foreign or missing session {}",
                        player_id, session_id
                    ))
                }
            }
        }

        Ok(())
    }
}
