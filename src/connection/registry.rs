//! Registry of connected players and their outbound channels

use crate::error::{ArenaError, Result};
use crate::protocol::ServerEvent;
use crate::types::{Player, PlayerId, PlayerStats};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

/// Outbound half of a client connection
pub type Outbox = mpsc::Sender<ServerEvent>;

/// Events buffered per connection before its transport counts as stalled
pub const OUTBOX_CAPACITY: usize = 128;

/// Free slots below which droppable events are shed, keeping room for
/// lifecycle events
const LIFECYCLE_RESERVE: usize = 16;

#[derive(Debug)]
struct Connection {
    player: Player,
    outbox: Outbox,
}

/// Owns every connected `Player`, keyed by transport session id
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<PlayerId, Connection>,
    total_connections: u64,
    peak_players: usize,
    /// Players whose outbox overflowed on an event that could not be shed
    stalled: Vec<PlayerId>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a player. Fails with `DuplicateId` if the id is taken.
    pub fn register(&mut self, player_id: &str, outbox: Outbox) -> Result<Player> {
        if self.connections.contains_key(player_id) {
            return Err(ArenaError::DuplicateId {
                player_id: player_id.to_string(),
            }
            .into());
        }

        let player = Player::new(player_id.to_string());
        self.connections.insert(
            player_id.to_string(),
            Connection {
                player: player.clone(),
                outbox,
            },
        );

        self.total_connections += 1;
        self.peak_players = self.peak_players.max(self.connections.len());

        info!(
            "Player '{}' connected - current: {}, peak: {}",
            player_id,
            self.connections.len(),
            self.peak_players
        );
        Ok(player)
    }

    /// Drop the player record. Cross-table cleanup is the caller's job.
    pub fn remove(&mut self, player_id: &str) -> Option<Player> {
        let removed = self.connections.remove(player_id).map(|c| c.player);
        if removed.is_some() {
            info!(
                "Player '{}' removed - current: {}",
                player_id,
                self.connections.len()
            );
        }
        removed
    }

    pub fn get(&self, player_id: &str) -> Option<&Player> {
        self.connections.get(player_id).map(|c| &c.player)
    }

    pub fn contains(&self, player_id: &str) -> bool {
        self.connections.contains_key(player_id)
    }

    pub fn stats(&self, player_id: &str) -> Option<PlayerStats> {
        self.get(player_id).map(|p| p.stats)
    }

    pub fn set_ready(&mut self, player_id: &str) -> bool {
        match self.connections.get_mut(player_id) {
            Some(connection) => {
                connection.player.ready = true;
                true
            }
            None => false,
        }
    }

    /// Fold a finished session into the player's lifetime stats
    pub fn record_session(&mut self, player_id: &str, won: bool, duration_ms: u64) {
        if let Some(connection) = self.connections.get_mut(player_id) {
            let stats = &mut connection.player.stats;
            stats.games_played += 1;
            if won {
                stats.wins += 1;
            }
            stats.total_time_ms += duration_ms;
        }
    }

    /// Push an event to one player without waiting. Returns false if the
    /// player is gone, its transport has closed, or the event was shed.
    ///
    /// Droppable events are shed once the outbox is nearly full. A full
    /// outbox on any other event marks the player stalled; see
    /// [`ConnectionRegistry::take_stalled`].
    pub fn send(&mut self, player_id: &str, event: ServerEvent) -> bool {
        let Some(connection) = self.connections.get(player_id) else {
            debug!(
                "Dropping {} for unknown player '{}'",
                event.kind(),
                player_id
            );
            return false;
        };

        let kind = event.kind();
        if event.is_droppable() && connection.outbox.capacity() <= LIFECYCLE_RESERVE {
            debug!("Outbox for player '{}' backed up, shed {}", player_id, kind);
            return false;
        }

        match connection.outbox.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbox for player '{}' is full, dropped {}", player_id, kind);
                if !self.stalled.iter().any(|id| id == player_id) {
                    self.stalled.push(player_id.to_string());
                }
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Outbox closed for player '{}', dropped {}", player_id, kind);
                false
            }
        }
    }

    /// Players marked stalled since the last call
    pub fn take_stalled(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.stalled)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections
    }

    pub fn peak_players(&self) -> usize {
        self.peak_players
    }
}
