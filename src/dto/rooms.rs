use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::{RoomEntity, RoomPatch, RoomStatus};
use crate::dto::format_system_time;
use crate::dto::validation::{validate_display_name, validate_room_code};

/// Payload creating a fresh room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    /// Name the creator plays under.
    #[validate(custom(function = validate_display_name))]
    pub player_name: String,
    /// Optional display name for the room.
    #[serde(default)]
    pub room_name: Option<String>,
}

/// Payload joining a room by code.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    /// The join code as typed (or carried by a shared link); normalized to
    /// uppercase before lookup.
    #[validate(custom(function = validate_room_code))]
    pub room_code: String,
    /// Name the joining player plays under.
    #[validate(custom(function = validate_display_name))]
    pub player_name: String,
}

/// Payload reconnecting a returning player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ResumeRoomRequest {
    /// Name the returning player played under.
    #[validate(custom(function = validate_display_name))]
    pub player_name: String,
}

/// Payload fetching the still-live subset of bookmarked rooms.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupRoomsRequest {
    /// Room ids to cross-reference.
    pub ids: Vec<Uuid>,
}

/// Partial room update. Absent fields are untouched; the pointer fields
/// distinguish "absent" (leave alone) from "null" (clear).
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RoomPatchRequest {
    /// Replace the display name.
    #[serde(default)]
    pub room_name: Option<String>,
    /// Fill the second player slot.
    #[serde(default)]
    pub player2_name: Option<String>,
    /// Set the creator's connection flag.
    #[serde(default)]
    pub player1_connected: Option<bool>,
    /// Set the joiner's connection flag.
    #[serde(default)]
    pub player2_connected: Option<bool>,
    /// Move the room lifecycle status (`waiting`, `playing`, `finished`).
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub status: Option<RoomStatus>,
    /// Publish the level of the question in play.
    #[serde(default)]
    pub current_level: Option<u32>,
    /// Set or clear the question pointer.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<Uuid>)]
    pub current_question_id: Option<Option<Uuid>>,
    /// Set or clear the active event pointer.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<Uuid>)]
    pub current_event_id: Option<Option<Uuid>>,
    /// Set or clear the solo-event performer.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<String>)]
    pub event_player_name: Option<Option<String>>,
}

impl From<RoomPatchRequest> for RoomPatch {
    fn from(request: RoomPatchRequest) -> Self {
        Self {
            room_name: request.room_name,
            player2_name: request.player2_name,
            player1_connected: request.player1_connected,
            player2_connected: request.player2_connected,
            status: request.status,
            current_level: request.current_level,
            current_question_id: request.current_question_id,
            current_event_id: request.current_event_id,
            event_player_name: request.event_player_name,
        }
    }
}

/// Public projection of a room row.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    /// Room identifier.
    pub id: Uuid,
    /// Join code, uppercase.
    pub room_code: String,
    /// Optional display name.
    pub room_name: Option<String>,
    /// Creator's player name.
    pub player1_name: String,
    /// Joiner's player name, when filled.
    pub player2_name: Option<String>,
    /// Creator's connection flag.
    pub player1_connected: bool,
    /// Joiner's connection flag.
    pub player2_connected: bool,
    /// Lifecycle status (`waiting`, `playing`, `finished`).
    pub status: String,
    /// Level of the question in play.
    pub current_level: Option<u32>,
    /// Question pointer.
    pub current_question_id: Option<Uuid>,
    /// Active event pointer.
    pub current_event_id: Option<Uuid>,
    /// Solo-event performer.
    pub event_player_name: Option<String>,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 last-update timestamp.
    pub updated_at: String,
}

impl From<RoomEntity> for RoomSummary {
    fn from(room: RoomEntity) -> Self {
        Self {
            id: room.id,
            room_code: room.room_code,
            room_name: room.room_name,
            player1_name: room.player1_name,
            player2_name: room.player2_name,
            player1_connected: room.player1_connected,
            player2_connected: room.player2_connected,
            status: status_label(room.status).to_string(),
            current_level: room.current_level,
            current_question_id: room.current_question_id,
            current_event_id: room.current_event_id,
            event_player_name: room.event_player_name,
            created_at: format_system_time(room.created_at),
            updated_at: format_system_time(room.updated_at),
        }
    }
}

fn status_label(status: RoomStatus) -> &'static str {
    match status {
        RoomStatus::Waiting => "waiting",
        RoomStatus::Playing => "playing",
        RoomStatus::Finished => "finished",
    }
}
