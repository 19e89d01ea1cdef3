//! Duel Room - two-player intensity contest server
//!
//! This crate pairs connected players first-come first-served, relays each
//! player's live intensity samples to their opponent for a fixed duration,
//! and resolves the winner when the contest ends or a player leaves.

pub mod config;
pub mod connection;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod protocol;
pub mod service;
pub mod session;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{ArenaError, Result};
pub use types::*;

// Re-export key components
pub use protocol::{ClientMessage, ServerEvent};
pub use service::{ArenaEngine, ArenaHandle};
pub use session::{JoinResult, SessionManager, TimerEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
