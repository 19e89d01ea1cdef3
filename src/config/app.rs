//! Main application configuration
//!
//! This module defines the primary configuration structures for the duel-room
//! service, including environment variable and TOML file loading and validation.

use crate::error::ArenaError;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub arena: ArenaSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and health reports
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interface the HTTP/WebSocket server binds to
    pub http_host: String,
    /// Port for the HTTP/WebSocket server
    pub http_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
    /// Interval between periodic health log lines
    pub health_check_interval_seconds: u64,
}

/// Contest rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    /// Fixed duration of every session
    pub session_duration_ms: u64,
    /// How long a finished session stays queryable before it is dropped
    pub cleanup_grace_ms: u64,
    /// Maximum characters kept from a chat message
    pub chat_max_length: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "duel-room".to_string(),
            log_level: "info".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 5173,
            shutdown_timeout_seconds: 30,
            health_check_interval_seconds: 30,
        }
    }
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            session_duration_ms: 30_000,
            cleanup_grace_ms: 30_000,
            chat_max_length: 200,
        }
    }
}

impl ArenaSettings {
    /// Session duration as Duration
    pub fn session_duration(&self) -> Duration {
        Duration::from_millis(self.session_duration_ms)
    }

    /// Cleanup grace period as Duration
    pub fn cleanup_grace(&self) -> Duration {
        Duration::from_millis(self.cleanup_grace_ms)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("Invalid {} value: {}", key, raw)),
        Err(_) => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; environment variables still override it
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| anyhow!("Invalid configuration file: {}", e))
    }

    fn apply_env(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HTTP_HOST") {
            self.service.http_host = host;
        }
        if let Some(port) = parse_env("HTTP_PORT")? {
            self.service.http_port = port;
        }
        if let Some(timeout) = parse_env("SHUTDOWN_TIMEOUT_SECONDS")? {
            self.service.shutdown_timeout_seconds = timeout;
        }
        if let Some(interval) = parse_env("HEALTH_CHECK_INTERVAL_SECONDS")? {
            self.service.health_check_interval_seconds = interval;
        }

        // Arena settings
        if let Some(duration) = parse_env("SESSION_DURATION_MS")? {
            self.arena.session_duration_ms = duration;
        }
        if let Some(grace) = parse_env("CLEANUP_GRACE_MS")? {
            self.arena.cleanup_grace_ms = grace;
        }
        if let Some(max_len) = parse_env("CHAT_MAX_LENGTH")? {
            self.arena.chat_max_length = max_len;
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get health log interval as Duration
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.service.health_check_interval_seconds)
    }
}

fn invalid(message: String) -> anyhow::Error {
    ArenaError::ConfigurationError { message }.into()
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(invalid(format!("Invalid log level: {}", config.service.log_level))),
    }

    if config.service.http_port == 0 {
        return Err(invalid("HTTP port cannot be 0".to_string()));
    }
    if config.service.http_host.is_empty() {
        return Err(invalid("HTTP host cannot be empty".to_string()));
    }
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(invalid("Shutdown timeout must be greater than 0".to_string()));
    }
    if config.service.health_check_interval_seconds == 0 {
        return Err(invalid("Health check interval must be greater than 0".to_string()));
    }

    if config.arena.session_duration_ms == 0 {
        return Err(invalid("Session duration must be greater than 0".to_string()));
    }
    if config.arena.cleanup_grace_ms == 0 {
        return Err(invalid("Cleanup grace period must be greater than 0".to_string()));
    }
    if config.arena.chat_max_length == 0 {
        return Err(invalid("Chat max length must be greater than 0".to_string()));
    }

    Ok(())
}
