//! Network surface: axum router and WebSocket sessions

pub mod router;
pub mod websocket;

pub use router::{create_router, ArenaServer, ServerConfig, ServerState};
