//! Session lifecycle for the duel service
//!
//! This module handles session creation, the telemetry relay between the two
//! participants, outcome resolution and deferred cleanup.

pub mod instance;
pub mod manager;
pub mod outcome;
pub mod relay;

// Re-export commonly used types
pub use instance::{PlayerTelemetry, Session};
pub use manager::{JoinResult, SessionManager, TimerEvent};
pub use outcome::OutcomeResolver;
pub use relay::TelemetryRelay;
