//! Matchmaking waitlist

pub mod queue;

pub use queue::{EnqueueResult, MatchQueue};
