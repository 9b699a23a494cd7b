use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Answer submission payloads.
pub mod answers;
/// Event response and catalog payloads.
pub mod events;
/// Health check payloads.
pub mod health;
/// Room lifecycle payloads.
pub mod rooms;
/// Server-sent-event payloads.
pub mod sse;
/// Validation helpers for request payloads.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
