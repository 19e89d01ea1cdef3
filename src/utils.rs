//! Utility functions for the duel service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique session ID
pub fn generate_session_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new transport connection ID
pub fn generate_connection_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Current wall clock time as epoch milliseconds
pub fn current_timestamp_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Accepts only finite values in the closed range [0, 1]
pub fn is_valid_intensity(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Trim a chat line and cap it at `max_chars` characters
pub fn sanitize_chat(message: &str, max_chars: usize) -> Option<String> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}
