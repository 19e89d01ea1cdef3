//! Arena engine: the single task that owns the session manager
//!
//! Transport tasks talk to the engine through an [`ArenaHandle`]. Every
//! command and every fired timer is applied in arrival order by one task, so
//! the registry, queue and session tables are never observed half-updated.

use crate::config::ArenaSettings;
use crate::connection::Outbox;
use crate::error::{ArenaError, Result};
use crate::metrics::MetricsCollector;
use crate::protocol::ClientMessage;
use crate::session::{SessionManager, TimerEvent};
use crate::types::{ArenaStats, PlayerId};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Commands buffered before senders wait for the engine to catch up
pub const COMMAND_CAPACITY: usize = 1024;

/// Requests accepted by the engine task
#[derive(Debug)]
pub enum Command {
    Connect {
        player_id: PlayerId,
        outbox: Outbox,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        player_id: PlayerId,
    },
    Message {
        player_id: PlayerId,
        message: ClientMessage,
    },
    Stats {
        reply: oneshot::Sender<ArenaStats>,
    },
    /// Run the cross-table consistency check
    Verify {
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

impl Command {
    fn kind(&self) -> &'static str {
        match self {
            Command::Connect { .. } => "connect",
            Command::Disconnect { .. } => "disconnect",
            Command::Message { message, .. } => message.kind(),
            Command::Stats { .. } => "stats",
            Command::Verify { .. } => "verify",
            Command::Shutdown => "shutdown",
        }
    }
}

pub struct ArenaEngine {
    manager: SessionManager,
    commands: mpsc::Receiver<Command>,
    timers: mpsc::UnboundedReceiver<TimerEvent>,
    metrics: Arc<MetricsCollector>,
}

impl ArenaEngine {
    /// Build an engine and the handle used to reach it
    pub fn new(settings: ArenaSettings, metrics: Arc<MetricsCollector>) -> (Self, ArenaHandle) {
        let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        // each session has at most two pending timers
        let (timer_tx, timers) = mpsc::unbounded_channel();

        let manager = SessionManager::with_metrics(settings, timer_tx, metrics.clone());
        let engine = Self {
            manager,
            commands,
            timers,
            metrics,
        };

        (engine, ArenaHandle { commands: command_tx })
    }

    /// Build an engine and run it on a new task
    pub fn spawn(
        settings: ArenaSettings,
        metrics: Arc<MetricsCollector>,
    ) -> (ArenaHandle, JoinHandle<()>) {
        let (engine, handle) = Self::new(settings, metrics);
        let task = tokio::spawn(engine.run());
        (handle, task)
    }

    /// Process commands and timers until shutdown or until every handle is
    /// dropped
    pub async fn run(mut self) {
        info!("Arena engine started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        debug!("All arena handles dropped");
                        break;
                    };
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Some(event) = self.timers.recv() => {
                    self.manager.handle_timer(event);
                }
            }

            let evicted = self.manager.evict_stalled();
            if evicted > 0 {
                info!("Evicted {} stalled connection(s)", evicted);
            }
        }

        let stats = self.manager.stats();
        info!(
            "Arena engine stopped - sessions: {}, connections: {}, peak players: {}",
            stats.total_sessions, stats.total_connections, stats.peak_players
        );
    }

    fn handle_command(&mut self, command: Command) -> bool {
        let started = Instant::now();
        let kind = command.kind();

        match command {
            Command::Connect {
                player_id,
                outbox,
                reply,
            } => {
                let result = self.manager.register(&player_id, outbox).map(|_| ());
                if let Err(e) = &result {
                    warn!("Connection for '{}' refused: {}", player_id, e);
                }
                let _ = reply.send(result);
            }
            Command::Disconnect { player_id } => {
                if self.manager.unregister(&player_id) {
                    info!("Player '{}' disconnected", player_id);
                }
            }
            Command::Message { player_id, message } => {
                if let Err(e) = self.manager.handle_message(&player_id, message) {
                    warn!("Message from '{}' not handled: {}", player_id, e);
                }
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.manager.stats());
            }
            Command::Verify { reply } => {
                let _ = reply.send(self.manager.verify_invariants());
            }
            Command::Shutdown => {
                info!("Arena engine shutdown requested");
                return false;
            }
        }

        self.metrics.record_command(kind, started.elapsed());
        true
    }
}

/// Cloneable sender side of the engine
#[derive(Debug, Clone)]
pub struct ArenaHandle {
    commands: mpsc::Sender<Command>,
}

impl ArenaHandle {
    /// Queue a command, waiting while the engine is backed up
    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ArenaError::EngineUnavailable.into())
    }

    /// Register a connection and wait for the engine to accept it
    pub async fn connect(&self, player_id: &str, outbox: Outbox) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Connect {
            player_id: player_id.to_string(),
            outbox,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ArenaError::EngineUnavailable)?
    }

    pub async fn disconnect(&self, player_id: &str) -> Result<()> {
        self.send(Command::Disconnect {
            player_id: player_id.to_string(),
        })
        .await
    }

    pub async fn dispatch(&self, player_id: &str, message: ClientMessage) -> Result<()> {
        self.send(Command::Message {
            player_id: player_id.to_string(),
            message,
        })
        .await
    }

    pub async fn stats(&self) -> Result<ArenaStats> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply }).await?;
        Ok(rx.await.map_err(|_| ArenaError::EngineUnavailable)?)
    }

    pub async fn verify_invariants(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Verify { reply }).await?;
        rx.await.map_err(|_| ArenaError::EngineUnavailable)?
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
