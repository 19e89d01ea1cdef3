//! Service layer for the duel-room service
//!
//! This module contains the arena engine task, the application state that
//! wires it to the network, and health reporting.

pub mod app;
pub mod engine;
pub mod health;

pub use app::{AppState, ServiceError};
pub use engine::{ArenaEngine, ArenaHandle, Command};
pub use health::{HealthCheck, HealthStatus};
