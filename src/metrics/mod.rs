//! Metrics and monitoring for the duel-room service
//!
//! This module provides Prometheus metrics collection and text encoding for
//! the `/metrics` endpoint.

pub mod collector;

pub use collector::{ConnectionMetrics, MetricsCollector, PerformanceMetrics, SessionMetrics};

use anyhow::Result;
use prometheus::{Encoder, TextEncoder};

/// Render every registered metric family in Prometheus text format
pub fn encode_metrics(collector: &MetricsCollector) -> Result<String> {
    let metric_families = collector.registry().gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Metrics are not UTF-8: {}", e))
}
