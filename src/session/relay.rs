//! Telemetry relay between the two participants of a session
//!
//! Each accepted sample is folded into the sender's telemetry and forwarded
//! once, to the opponent only. Forwarding never waits on the opponent's
//! transport; a backed-up outbox sheds the sample instead.

use crate::connection::ConnectionRegistry;
use crate::protocol::ServerEvent;
use crate::session::instance::Session;
use tracing::debug;

pub struct TelemetryRelay;

impl TelemetryRelay {
    /// Record a validated sample from `from_player_id` and forward it to the
    /// other participant. Returns false if the session refused the sample.
    pub fn deliver(
        session: &mut Session,
        registry: &mut ConnectionRegistry,
        from_player_id: &str,
        value: f64,
        timestamp: i64,
    ) -> bool {
        let Some(telemetry) = session.telemetry_mut(from_player_id) else {
            debug!(
                "Session {} refused sample from '{}'",
                session.id(),
                from_player_id
            );
            return false;
        };
        telemetry.record(value, timestamp);
        session.touch(timestamp);

        if let Some(opponent) = session.opponent_of(from_player_id) {
            registry.send(
                opponent,
                ServerEvent::OpponentIntensity {
                    from_player_id: from_player_id.to_string(),
                    value,
                    timestamp,
                },
            );
        }
        true
    }

    /// Forward a sanitized chat line to the opponent
    pub fn relay_chat(
        session: &Session,
        registry: &mut ConnectionRegistry,
        from_player_id: &str,
        message: String,
        timestamp: i64,
    ) -> bool {
        let Some(opponent) = session.opponent_of(from_player_id) else {
            return false;
        };

        registry.send(
            opponent,
            ServerEvent::ChatMessage {
                from_player_id: from_player_id.to_string(),
                message,
                timestamp,
            },
        )
    }
}
