//! Outcome resolution for finished sessions

use crate::connection::ConnectionRegistry;
use crate::protocol::ServerEvent;
use crate::session::instance::Session;
use crate::types::{EndReason, PlayerId, SessionOutcome};
use std::cmp::Ordering;
use tokio::time::Instant;
use tracing::info;

const OPPONENT_LEFT_MESSAGE: &str = "Your opponent disconnected. You win!";

pub struct OutcomeResolver;

impl OutcomeResolver {
    /// Winner rule. A disconnect always hands the win to the other player;
    /// a timeout goes to the strictly higher peak, equal peaks draw.
    pub fn decide_winner(
        session: &Session,
        reason: EndReason,
        disconnected_id: Option<&str>,
    ) -> Option<PlayerId> {
        let [first, second] = session.participants();

        match reason {
            EndReason::Disconnect => {
                disconnected_id.and_then(|id| session.opponent_of(id).cloned())
            }
            EndReason::Timeout => {
                let first_peak = session.peak_intensity(first).unwrap_or(0.0);
                let second_peak = session.peak_intensity(second).unwrap_or(0.0);
                match first_peak.partial_cmp(&second_peak) {
                    Some(Ordering::Greater) => Some(first.clone()),
                    Some(Ordering::Less) => Some(second.clone()),
                    _ => None,
                }
            }
        }
    }

    /// Finish an active session, update both players' stats and emit the
    /// outcome. Returns `None` without side effects if the session already
    /// left `active`.
    pub fn finalize(
        session: &mut Session,
        registry: &mut ConnectionRegistry,
        reason: EndReason,
        disconnected_id: Option<&str>,
        now: Instant,
    ) -> Option<SessionOutcome> {
        let duration_ms = session.finish(now)?;

        let winner_id = Self::decide_winner(session, reason, disconnected_id);
        let outcome = SessionOutcome {
            session_id: session.id(),
            winner_id: winner_id.clone(),
            per_player_summary: session.summaries(),
            duration_ms,
            reason,
        };

        for participant in session.participants() {
            let won = winner_id.as_deref() == Some(participant.as_str());
            registry.record_session(participant, won, duration_ms);
        }

        for participant in session.participants() {
            if Some(participant.as_str()) == disconnected_id {
                continue;
            }
            if reason == EndReason::Disconnect {
                registry.send(
                    participant,
                    ServerEvent::OpponentLeft {
                        message: OPPONENT_LEFT_MESSAGE.to_string(),
                    },
                );
            }
            registry.send(participant, ServerEvent::SessionEnd(outcome.clone()));
        }

        info!(
            "Session {} finished - reason: {}, winner: {}, duration: {}ms",
            outcome.session_id,
            reason,
            winner_id.as_deref().unwrap_or("draw"),
            duration_ms
        );
        Some(outcome)
    }
}
