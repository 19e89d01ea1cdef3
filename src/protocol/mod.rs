//! Client/server wire protocol
//!
//! Closed, tagged message sets exchanged with connected clients over the
//! WebSocket transport.

pub mod messages;

pub use messages::{ClientMessage, MessageUtils, ServerEvent};
