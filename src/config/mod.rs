//! Configuration management for the duel-room service
//!
//! This module handles all configuration loading from environment variables
//! and TOML files, validation, and default values.

pub mod app;

// Re-export commonly used types
pub use app::{validate_config, AppConfig, ArenaSettings, ServiceSettings};
