//! HTTP surface of the duel service
//!
//! Serves the WebSocket endpoint players connect to, plus health checks,
//! arena statistics and Prometheus metrics, using Axum.

use crate::metrics::{encode_metrics, MetricsCollector};
use crate::service::engine::ArenaHandle;
use crate::service::health::{HealthCheck, HealthStatus};
use crate::transport::websocket::ws_handler;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5173,
        }
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ServerState {
    pub service_name: String,
    pub handle: ArenaHandle,
    pub metrics: Arc<MetricsCollector>,
    running: Arc<RwLock<bool>>,
}

impl ServerState {
    pub fn new(service_name: &str, handle: ArenaHandle, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            service_name: service_name.to_string(),
            handle,
            metrics,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    pub async fn set_running(&self, running: bool) {
        *self.running.write().await = running;
    }
}

/// Axum server for players and monitoring
pub struct ArenaServer {
    config: ServerConfig,
    state: ServerState,
    shutdown_tx: broadcast::Sender<()>,
}

impl ArenaServer {
    pub fn new(config: ServerConfig, state: ServerState) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            state,
            shutdown_tx,
        }
    }

    /// Bind and serve until `stop` is called
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid server address")?;

        let app = self.create_router();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("Duel server listening on http://{} (ws://{}/ws)", addr, addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Server shutdown signal received");
            })
            .await?;

        info!("Duel server stopped");
        Ok(())
    }

    pub fn create_router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn stop(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to server: {}", e);
        }
    }
}

/// Build the router with every endpoint
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/alive", get(alive_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

async fn root_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(json!({
        "service": state.service_name,
        "version": crate::VERSION,
        "endpoints": ["/ws", "/health", "/ready", "/alive", "/metrics", "/stats"]
    }))
}

async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    debug!("Health check requested");

    match HealthCheck::check(&state).await {
        Ok(health) => {
            let code = match health.status {
                HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::OK,
            };
            let stats = health
                .stats
                .as_ref()
                .and_then(|s| serde_json::to_value(s).ok())
                .unwrap_or(json!(null));
            (
                code,
                Json(json!({
                    "status": health.status,
                    "service": health.service,
                    "version": health.version,
                    "timestamp": health.timestamp,
                    "checks": health.checks,
                    "stats": stats
                })),
            )
        }
        Err(e) => {
            error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unhealthy", "service": state.service_name })),
            )
        }
    }
}

async fn ready_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match HealthCheck::readiness_check(&state).await {
        HealthStatus::Healthy => (StatusCode::OK, "Ready"),
        HealthStatus::Degraded => (StatusCode::OK, "Degraded but ready"),
        HealthStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
    }
}

async fn alive_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match HealthCheck::liveness_check(&state).await {
        HealthStatus::Healthy => (StatusCode::OK, "Alive"),
        _ => (StatusCode::SERVICE_UNAVAILABLE, "Not alive"),
    }
}

async fn metrics_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match encode_metrics(&state.metrics) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        ),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                "Failed to encode metrics".to_string(),
            )
        }
    }
}

async fn stats_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match state.handle.stats().await {
        Ok(stats) => (StatusCode::OK, Json(json!(stats))),
        Err(e) => {
            error!("Failed to get arena stats: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Arena engine unavailable" })),
            )
        }
    }
}
