use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Lifecycle of a shared room row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Room exists but the second player has not arrived or play has not started.
    Waiting,
    /// Both players are in and a question pointer has been published.
    Playing,
    /// The question catalog has been exhausted.
    Finished,
}

/// Shared room row: the only record both clients write and re-derive from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub id: Uuid,
    /// Short human-typable join code, stored uppercase.
    pub room_code: String,
    /// Optional display name chosen at creation.
    pub room_name: Option<String>,
    /// Name of the player who created the room.
    pub player1_name: String,
    /// Name of the joining player, filled on first join.
    pub player2_name: Option<String>,
    /// Whether the creator has (re)connected. Never cleared.
    pub player1_connected: bool,
    /// Whether the joiner has (re)connected. Never cleared.
    pub player2_connected: bool,
    /// Room lifecycle status.
    pub status: RoomStatus,
    /// Level of the question currently in play.
    pub current_level: Option<u32>,
    /// Pointer into the question catalog, null before play starts.
    pub current_question_id: Option<Uuid>,
    /// Pointer into the event catalog while a bonus event is in progress.
    pub current_event_id: Option<Uuid>,
    /// Performing player for solo events; null for joint events and when no
    /// event is active.
    pub event_player_name: Option<String>,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Last time any field of this row was written.
    pub updated_at: SystemTime,
}

impl RoomEntity {
    /// Build a fresh room row for its creator.
    pub fn new(room_code: String, room_name: Option<String>, player1_name: String) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            room_code,
            room_name,
            player1_name,
            player2_name: None,
            player1_connected: true,
            player2_connected: false,
            status: RoomStatus::Waiting,
            current_level: None,
            current_question_id: None,
            current_event_id: None,
            event_player_name: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// True once both connection flags are set.
    pub fn both_connected(&self) -> bool {
        self.player1_connected && self.player2_connected
    }

    /// Name of the other player, from this player's perspective.
    pub fn partner_name(&self, me: &str) -> Option<&str> {
        if self.player1_name == me {
            self.player2_name.as_deref()
        } else {
            Some(self.player1_name.as_str())
        }
    }

    /// Whether the given name occupies one of the two player slots.
    pub fn is_member(&self, name: &str) -> bool {
        self.player1_name == name || self.player2_name.as_deref() == Some(name)
    }

    /// Apply a partial update in place, bumping `updated_at`.
    pub fn apply(&mut self, patch: RoomPatch) {
        if let Some(name) = patch.room_name {
            self.room_name = Some(name);
        }
        if let Some(name) = patch.player2_name {
            self.player2_name = Some(name);
        }
        if let Some(flag) = patch.player1_connected {
            self.player1_connected = flag;
        }
        if let Some(flag) = patch.player2_connected {
            self.player2_connected = flag;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(level) = patch.current_level {
            self.current_level = Some(level);
        }
        if let Some(question) = patch.current_question_id {
            self.current_question_id = question;
        }
        if let Some(event) = patch.current_event_id {
            self.current_event_id = event;
        }
        if let Some(performer) = patch.event_player_name {
            self.event_player_name = performer;
        }
        self.updated_at = SystemTime::now();
    }
}

/// Partial update of a room row. Plain fields distinguish "leave alone" from
/// "set"; nullable pointers use a double option so a patch can also clear
/// them. Callers only touch fields they own for a given transition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomPatch {
    /// Replace the display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    /// Fill the second player slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2_name: Option<String>,
    /// Set the creator's connection flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player1_connected: Option<bool>,
    /// Set the joiner's connection flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player2_connected: Option<bool>,
    /// Move the room lifecycle status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RoomStatus>,
    /// Publish the level of the question in play.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_level: Option<u32>,
    /// Set or clear the question pointer.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub current_question_id: Option<Option<Uuid>>,
    /// Set or clear the active event pointer.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub current_event_id: Option<Option<Uuid>>,
    /// Set or clear the solo-event performer.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub event_player_name: Option<Option<String>>,
}

/// One player's submission for one question in one room. Insert-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Primary key of the answer row.
    pub id: Uuid,
    /// Room this answer belongs to.
    pub room_id: Uuid,
    /// Question this answer responds to.
    pub question_id: Uuid,
    /// Name of the submitting player.
    pub player_name: String,
    /// Free-text answer; null when the player skipped.
    pub answer: Option<String>,
    /// Whether the player passed on the question.
    pub skipped: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl AnswerEntity {
    /// Build a fresh answer row.
    pub fn new(
        room_id: Uuid,
        question_id: Uuid,
        player_name: String,
        answer: Option<String>,
        skipped: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            question_id,
            player_name,
            answer,
            skipped,
            created_at: SystemTime::now(),
        }
    }
}

/// One player's response to one bonus event occurrence. Unlike answers this
/// row may be rewritten in place, because an event can be re-entered after a
/// reload before both sides finish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventResponseEntity {
    /// Primary key of the response row.
    pub id: Uuid,
    /// Room this response belongs to.
    pub room_id: Uuid,
    /// Event definition this response answers.
    pub event_id: Uuid,
    /// Name of the responding player.
    pub player_name: String,
    /// Free-text response payload, if the event collects one.
    pub response: Option<String>,
    /// Whether the player finished their part of the event.
    pub completed: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl EventResponseEntity {
    /// Build a fresh event response row.
    pub fn new(
        room_id: Uuid,
        event_id: Uuid,
        player_name: String,
        response: Option<String>,
        completed: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            event_id,
            player_name,
            response,
            completed,
            created_at: SystemTime::now(),
        }
    }
}

/// Question catalog entry. Read-only from the engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Stable identifier referenced by room rows and answers.
    pub id: Uuid,
    /// The question text shown to both players.
    pub text: String,
    /// Tier this question belongs to.
    pub level: u32,
    /// Position within the tier.
    pub sort_order: u32,
    /// Suggested answers offered alongside the free-text input.
    pub suggestions: Vec<String>,
}

/// Category of a bonus event, fixed by the catalog entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Free-text message to the partner.
    Message,
    /// A promise the player commits to.
    Promise,
    /// Photo confirmation challenge.
    Photo,
    /// Timed synchronized-response challenge.
    Sync,
    /// Rock-paper-scissors style mini-game.
    Game,
    /// A confession prompt.
    Confession,
}

/// Bonus event catalog entry. Read-only from the engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEventEntity {
    /// Stable identifier referenced by room rows and responses.
    pub id: Uuid,
    /// Event category.
    pub kind: EventKind,
    /// Short title shown on the event card.
    pub title: String,
    /// Full instructions for the event.
    pub description: String,
    /// Minimum tier from which this event can fire.
    pub level: u32,
    /// Whether both players act, or a single performer.
    pub requires_both: bool,
    /// Whether the performer's response is withheld from the partner.
    pub is_private: bool,
    /// Position within the tier.
    pub sort_order: u32,
}

/// Change-feed payload carrying the full new version of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange {
    /// A room row was inserted or updated.
    Room(RoomEntity),
    /// An answer row was inserted.
    Answer(AnswerEntity),
    /// An event response row was inserted or updated.
    EventResponse(EventResponseEntity),
}

impl RecordChange {
    /// Room the changed row belongs to, used by consumers to filter the
    /// store-wide feed down to their own subscription scope.
    pub fn room_id(&self) -> Uuid {
        match self {
            RecordChange::Room(room) => room.id,
            RecordChange::Answer(answer) => answer.room_id,
            RecordChange::EventResponse(response) => response.room_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_clears_event_pointer_but_leaves_question() {
        let mut room = RoomEntity::new("ABCDEF".into(), None, "Alex".into());
        let question = Uuid::new_v4();
        room.current_question_id = Some(question);
        room.current_event_id = Some(Uuid::new_v4());
        room.event_player_name = Some("Alex".into());

        room.apply(RoomPatch {
            current_event_id: Some(None),
            event_player_name: Some(None),
            ..RoomPatch::default()
        });

        assert_eq!(room.current_question_id, Some(question));
        assert_eq!(room.current_event_id, None);
        assert_eq!(room.event_player_name, None);
    }

    #[test]
    fn patch_round_trips_double_option_fields() {
        let patch = RoomPatch {
            player2_connected: Some(true),
            current_event_id: Some(None),
            ..RoomPatch::default()
        };

        let json = serde_json::to_string(&patch).unwrap();
        let back: RoomPatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, patch);
        // Absent fields must stay absent, not become explicit nulls.
        assert!(!json.contains("current_question_id"));
    }

    #[test]
    fn partner_name_is_symmetric() {
        let mut room = RoomEntity::new("ABCDEF".into(), None, "Alex".into());
        assert_eq!(room.partner_name("Alex"), None);
        room.player2_name = Some("Sam".into());
        assert_eq!(room.partner_name("Alex"), Some("Sam"));
        assert_eq!(room.partner_name("Sam"), Some("Alex"));
    }
}
