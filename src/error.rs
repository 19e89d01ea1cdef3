//! Error types for the duel service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific arena scenarios
#[derive(Debug, thiserror::Error)]
pub enum ArenaError {
    #[error("Player already registered: {player_id}")]
    DuplicateId { player_id: String },

    #[error("Player not found: {player_id}")]
    PlayerNotFound { player_id: String },

    #[error("Invalid client message: {reason}")]
    InvalidMessage { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Arena engine is not running")]
    EngineUnavailable,

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
