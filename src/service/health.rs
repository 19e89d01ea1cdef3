//! Health check reporting
//!
//! This module provides health check functionality for the duel-room
//! service, including readiness and liveness probes.

use crate::transport::ServerState;
use crate::types::ArenaStats;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Arena counters, absent when the engine could not be reached
    pub stats: Option<ArenaStats>,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

impl HealthCheck {
    /// Perform a full health check of the service
    pub async fn check(state: &ServerState) -> Result<Self> {
        let mut checks = Vec::new();

        let service_check = Self::check_service_running(state).await;
        let mut overall_status = service_check.status.clone();
        checks.push(service_check);

        let (engine_check, stats) = Self::check_engine(state).await;
        if engine_check.status == HealthStatus::Unhealthy {
            overall_status = HealthStatus::Unhealthy;
        }
        checks.push(engine_check);

        Ok(HealthCheck {
            status: overall_status,
            service: state.service_name.clone(),
            version: crate::VERSION.to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(state: &ServerState) -> HealthStatus {
        if state.is_running().await {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Readiness check - the engine must answer
    pub async fn readiness_check(state: &ServerState) -> HealthStatus {
        if !state.is_running().await {
            return HealthStatus::Unhealthy;
        }
        Self::check_engine(state).await.0.status
    }

    async fn check_service_running(state: &ServerState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_engine(state: &ServerState) -> (ComponentCheck, Option<ArenaStats>) {
        let start = std::time::Instant::now();

        let (status, message, stats) = match state.handle.stats().await {
            Ok(stats) => (HealthStatus::Healthy, None, Some(stats)),
            Err(e) => {
                error!("Arena engine health check failed: {}", e);
                (HealthStatus::Unhealthy, Some(e.to_string()), None)
            }
        };

        let check = ComponentCheck {
            name: "arena_engine".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        (check, stats)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
