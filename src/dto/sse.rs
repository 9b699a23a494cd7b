use serde::Serialize;

use crate::dao::models::RecordChange;
use crate::dto::answers::AnswerSummary;
use crate::dto::events::EventResponseSummary;
use crate::dto::rooms::RoomSummary;

/// Event name used for room-row changes.
const EVENT_ROOM: &str = "room";
/// Event name used for inserted answers.
const EVENT_ANSWER: &str = "answer";
/// Event name used for inserted or updated event responses.
const EVENT_EVENT_RESPONSE: &str = "event_response";

#[derive(Clone, Debug)]
/// Dispatched payload carried on the SSE change stream.
pub struct ServerEvent {
    /// SSE event name, when the payload is typed.
    pub event: Option<String>,
    /// Serialized payload placed in the SSE data field.
    pub data: String,
}

impl ServerEvent {
    /// Build a plain event with an already-encoded body.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Encode a record-store change as a typed SSE event carrying the public
    /// projection of the changed row.
    pub fn from_change(change: RecordChange) -> serde_json::Result<Self> {
        match change {
            RecordChange::Room(room) => {
                Self::json(EVENT_ROOM.to_string(), &RoomSummary::from(room))
            }
            RecordChange::Answer(answer) => {
                Self::json(EVENT_ANSWER.to_string(), &AnswerSummary::from(answer))
            }
            RecordChange::EventResponse(response) => Self::json(
                EVENT_EVENT_RESPONSE.to_string(),
                &EventResponseSummary::from(response),
            ),
        }
    }
}
