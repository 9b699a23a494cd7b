use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{EventKind, EventResponseEntity, GameEventEntity, QuestionEntity};
use crate::dto::format_system_time;
use crate::dto::validation::validate_display_name;

/// Payload recording or rewriting one player's response to a bonus event.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitEventResponseRequest {
    /// Event being responded to.
    pub event_id: Uuid,
    /// Name of the responding player.
    #[validate(custom(function = validate_display_name))]
    pub player_name: String,
    /// Free-text response payload, if the event collects one.
    #[serde(default)]
    pub response: Option<String>,
    /// Whether the player finished their part. Defaults to true; pass false
    /// for mid-flow partial saves.
    #[serde(default = "default_completed")]
    pub completed: bool,
}

fn default_completed() -> bool {
    true
}

/// Query selecting the responses of one event occurrence.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListEventResponsesQuery {
    /// Event to filter on.
    pub event_id: Uuid,
}

/// Public projection of an event response row.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventResponseSummary {
    /// Response identifier.
    pub id: Uuid,
    /// Room the response belongs to.
    pub room_id: Uuid,
    /// Event the response answers.
    pub event_id: Uuid,
    /// Name of the responding player.
    pub player_name: String,
    /// Free-text response payload.
    pub response: Option<String>,
    /// Whether the player finished their part.
    pub completed: bool,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

impl From<EventResponseEntity> for EventResponseSummary {
    fn from(response: EventResponseEntity) -> Self {
        Self {
            id: response.id,
            room_id: response.room_id,
            event_id: response.event_id,
            player_name: response.player_name,
            response: response.response,
            completed: response.completed,
            created_at: format_system_time(response.created_at),
        }
    }
}

/// Public projection of a question catalog entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionSummary {
    /// Question identifier.
    pub id: Uuid,
    /// Question text.
    pub text: String,
    /// Tier the question belongs to.
    pub level: u32,
    /// Position within the tier.
    pub sort_order: u32,
    /// Suggested answers.
    pub suggestions: Vec<String>,
}

impl From<QuestionEntity> for QuestionSummary {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            text: question.text,
            level: question.level,
            sort_order: question.sort_order,
            suggestions: question.suggestions,
        }
    }
}

/// Public projection of an event catalog entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameEventSummary {
    /// Event identifier.
    pub id: Uuid,
    /// Event kind (`message`, `promise`, `photo`, `sync`, `game`,
    /// `confession`).
    pub kind: String,
    /// Short title.
    pub title: String,
    /// Full instructions.
    pub description: String,
    /// Minimum tier the event can fire from.
    pub level: u32,
    /// Whether both players act.
    pub requires_both: bool,
    /// Whether the response is withheld from the partner.
    pub is_private: bool,
    /// Position within the tier.
    pub sort_order: u32,
}

impl From<GameEventEntity> for GameEventSummary {
    fn from(event: GameEventEntity) -> Self {
        Self {
            id: event.id,
            kind: kind_label(event.kind).to_string(),
            title: event.title,
            description: event.description,
            level: event.level,
            requires_both: event.requires_both,
            is_private: event.is_private,
            sort_order: event.sort_order,
        }
    }
}

fn kind_label(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Message => "message",
        EventKind::Promise => "promise",
        EventKind::Photo => "photo",
        EventKind::Sync => "sync",
        EventKind::Game => "game",
        EventKind::Confession => "confession",
    }
}
