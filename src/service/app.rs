//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the arena engine,
//! the HTTP/WebSocket server and background tasks together.

use crate::config::AppConfig;
use crate::metrics::MetricsCollector;
use crate::service::engine::{ArenaEngine, ArenaHandle};
use crate::service::health::HealthCheck;
use crate::transport::{ArenaServer, ServerConfig, ServerState};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,

    /// Handle to the engine task owning all arena tables
    handle: ArenaHandle,
    engine_task: Option<JoinHandle<()>>,

    metrics: Arc<MetricsCollector>,
    server: Arc<ArenaServer>,
    server_state: ServerState,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,
}

impl AppState {
    /// Initialize the application. Spawns the engine but does not bind any
    /// socket yet.
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing duel-room service");
        info!(
            "Configuration: service={}, http={}:{}, session={}ms, grace={}ms",
            config.service.name,
            config.service.http_host,
            config.service.http_port,
            config.arena.session_duration_ms,
            config.arena.cleanup_grace_ms
        );

        crate::config::validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: e.to_string(),
        })?;

        let metrics =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );

        let (handle, engine_task) = ArenaEngine::spawn(config.arena.clone(), metrics.clone());

        let server_state = ServerState::new(&config.service.name, handle.clone(), metrics.clone());
        let server = Arc::new(ArenaServer::new(
            ServerConfig {
                host: config.service.http_host.clone(),
                port: config.service.http_port,
            },
            server_state.clone(),
        ));

        Ok(Self {
            config,
            handle,
            engine_task: Some(engine_task),
            metrics,
            server,
            server_state,
            background_tasks: Vec::new(),
        })
    }

    /// Start the HTTP server and background tasks
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting duel-room service");

        self.server_state.set_running(true).await;

        let server = self.server.clone();
        let server_task = tokio::spawn(async move {
            if let Err(e) = server.start().await {
                error!("Duel server failed: {}", e);
            }
        });
        self.background_tasks.push(server_task);

        let health_task = {
            let state = self.server_state.clone();
            let interval = self.config.health_check_interval();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                while state.is_running().await {
                    ticker.tick().await;
                    match HealthCheck::check(&state).await {
                        Ok(health) => match health.stats {
                            Some(stats) => debug!(
                                "Health: {} - players: {}, queued: {}, active sessions: {}",
                                health.status,
                                stats.current_players,
                                stats.queue_length,
                                stats.active_sessions
                            ),
                            None => warn!("Health: {}", health.status),
                        },
                        Err(e) => warn!("Health check failed: {}", e),
                    }
                }
            })
        };
        self.background_tasks.push(health_task);

        info!("✅ Duel-room service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of duel-room service");

        self.server_state.set_running(false).await;
        self.server.stop();

        let final_stats = self.handle.stats().await.ok();

        if let Err(e) = self.handle.shutdown().await {
            warn!("Arena engine already stopped: {}", e);
        }
        if let Some(task) = self.engine_task.take() {
            task.await.map_err(|e| ServiceError::BackgroundTask {
                message: format!("Arena engine task failed: {}", e),
            })?;
        }

        self.stop_background_tasks();

        if let Some(stats) = final_stats {
            info!("Final arena statistics: {:?}", stats);
        }
        info!("✅ Duel-room service shutdown completed");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn is_running(&self) -> bool {
        self.server_state.is_running().await
    }

    pub fn handle(&self) -> ArenaHandle {
        self.handle.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// State shared with HTTP handlers and health checks
    pub fn server_state(&self) -> &ServerState {
        &self.server_state
    }

    fn stop_background_tasks(&mut self) {
        let task_count = self.background_tasks.len();
        for task in self.background_tasks.drain(..) {
            task.abort();
        }
        debug!("Stopped {} background tasks", task_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::health::HealthStatus;

    #[tokio::test]
    async fn test_new_rejects_invalid_config() {
        let mut config = AppConfig::default();
        config.arena.session_duration_ms = 0;

        let result = AppState::new(config).await;
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_lifecycle_without_binding() {
        let mut app = AppState::new(AppConfig::default()).await.unwrap();
        assert!(!app.is_running().await);

        let health = HealthCheck::check(app.server_state()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(health.stats.is_some());

        app.shutdown().await.unwrap();
        assert!(app.handle().is_closed());
    }
}
