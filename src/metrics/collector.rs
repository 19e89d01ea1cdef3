//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the duel-room service using
//! Prometheus metrics.

use crate::types::EndReason;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the duel service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Connection-related metrics
    connection_metrics: ConnectionMetrics,

    /// Session-related metrics
    session_metrics: SessionMetrics,

    /// Engine performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Connection and queue metrics
#[derive(Clone)]
pub struct ConnectionMetrics {
    /// Players currently connected
    pub connected_players: IntGauge,

    /// Total connections accepted
    pub connections_total: IntCounter,

    /// Players currently waiting for an opponent
    pub queue_length: IntGauge,
}

/// Session metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Sessions currently active
    pub active_sessions: IntGauge,

    /// Total sessions created
    pub sessions_created_total: IntCounter,

    /// Total sessions finished by reason
    pub sessions_finished_total: IntCounterVec,

    /// Intensity samples by status (accepted, rejected)
    pub intensity_samples_total: IntCounterVec,

    /// Session duration
    pub session_duration_seconds: Histogram,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Time spent handling one engine command
    pub command_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let connection_metrics = ConnectionMetrics::new(&registry)?;
        let session_metrics = SessionMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            connection_metrics,
            session_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn connection(&self) -> &ConnectionMetrics {
        &self.connection_metrics
    }

    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Record a new connection
    pub fn record_player_connected(&self, connected: usize) {
        self.connection_metrics.connections_total.inc();
        self.connection_metrics
            .connected_players
            .set(connected as i64);
    }

    /// Record a connection going away
    pub fn record_player_disconnected(&self, connected: usize) {
        self.connection_metrics
            .connected_players
            .set(connected as i64);
    }

    pub fn set_queue_length(&self, length: usize) {
        self.connection_metrics.queue_length.set(length as i64);
    }

    /// Record a session being created
    pub fn record_session_started(&self, active: usize) {
        self.session_metrics.sessions_created_total.inc();
        self.session_metrics.active_sessions.set(active as i64);
    }

    /// Record a session finishing
    pub fn record_session_finished(&self, reason: EndReason, duration: Duration, active: usize) {
        self.session_metrics
            .sessions_finished_total
            .with_label_values(&[reason.as_str()])
            .inc();
        self.session_metrics
            .session_duration_seconds
            .observe(duration.as_secs_f64());
        self.session_metrics.active_sessions.set(active as i64);
    }

    /// Record an intensity sample
    pub fn record_intensity_sample(&self, accepted: bool) {
        let status = if accepted { "accepted" } else { "rejected" };
        self.session_metrics
            .intensity_samples_total
            .with_label_values(&[status])
            .inc();
    }

    /// Record how long an engine command took
    pub fn record_command(&self, kind: &str, duration: Duration) {
        self.performance_metrics
            .command_duration
            .with_label_values(&[kind])
            .observe(duration.as_secs_f64());
    }
}

impl ConnectionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let connected_players =
            IntGauge::new("duel_room_connected_players", "Players currently connected")?;
        registry.register(Box::new(connected_players.clone()))?;

        let connections_total =
            IntCounter::new("duel_room_connections_total", "Total connections accepted")?;
        registry.register(Box::new(connections_total.clone()))?;

        let queue_length = IntGauge::new(
            "duel_room_queue_length",
            "Players currently waiting for an opponent",
        )?;
        registry.register(Box::new(queue_length.clone()))?;

        Ok(Self {
            connected_players,
            connections_total,
            queue_length,
        })
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_sessions =
            IntGauge::new("duel_room_active_sessions", "Sessions currently active")?;
        registry.register(Box::new(active_sessions.clone()))?;

        let sessions_created_total =
            IntCounter::new("duel_room_sessions_created_total", "Total sessions created")?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let sessions_finished_total = IntCounterVec::new(
            Opts::new(
                "duel_room_sessions_finished_total",
                "Total sessions finished",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(sessions_finished_total.clone()))?;

        let intensity_samples_total = IntCounterVec::new(
            Opts::new(
                "duel_room_intensity_samples_total",
                "Intensity samples received",
            ),
            &["status"],
        )?;
        registry.register(Box::new(intensity_samples_total.clone()))?;

        let session_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "duel_room_session_duration_seconds",
                "Session duration in seconds",
            )
            .buckets(vec![1.0, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0]),
        )?;
        registry.register(Box::new(session_duration_seconds.clone()))?;

        Ok(Self {
            active_sessions,
            sessions_created_total,
            sessions_finished_total,
            intensity_samples_total,
            session_duration_seconds,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let command_duration = HistogramVec::new(
            HistogramOpts::new(
                "duel_room_command_duration_seconds",
                "Engine command processing time",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
            &["command"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        Ok(Self { command_duration })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _connection = collector.connection();
        let _session = collector.session();
        let _performance = collector.performance();
    }

    #[test]
    fn test_connection_gauges() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_player_connected(1);
        collector.record_player_connected(2);
        collector.record_player_disconnected(1);
        collector.set_queue_length(1);

        assert_eq!(collector.connection().connections_total.get(), 2);
        assert_eq!(collector.connection().connected_players.get(), 1);
        assert_eq!(collector.connection().queue_length.get(), 1);
    }

    #[test]
    fn test_session_counters() {
        let collector = MetricsCollector::new().unwrap();

        collector.record_session_started(1);
        collector.record_session_finished(EndReason::Disconnect, Duration::from_secs(5), 0);
        collector.record_intensity_sample(true);
        collector.record_intensity_sample(false);
        collector.record_intensity_sample(false);

        let session = collector.session();
        assert_eq!(session.sessions_created_total.get(), 1);
        assert_eq!(session.active_sessions.get(), 0);
        assert_eq!(
            session
                .sessions_finished_total
                .with_label_values(&["disconnect"])
                .get(),
            1
        );
        assert_eq!(
            session
                .intensity_samples_total
                .with_label_values(&["rejected"])
                .get(),
            2
        );
    }

    #[test]
    fn test_registry_exposes_families() {
        let collector = MetricsCollector::new().unwrap();
        collector.record_command("connect", Duration::from_micros(50));

        let names: Vec<String> = collector
            .registry()
            .gather()
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect();
        assert!(names.iter().any(|n| n == "duel_room_command_duration_seconds"));
        assert!(names.iter().any(|n| n == "duel_room_connected_players"));
    }
}
