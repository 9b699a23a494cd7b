use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::dao::models::AnswerEntity;
use crate::dto::format_system_time;
use crate::dto::validation::validate_display_name;

/// Payload recording one player's answer (or skip) for a question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    /// Question being answered.
    pub question_id: Uuid,
    /// Name of the submitting player.
    #[validate(custom(function = validate_display_name))]
    pub player_name: String,
    /// Free-text answer; omit when skipping.
    #[serde(default)]
    pub answer: Option<String>,
    /// Whether the player passes on the question.
    #[serde(default)]
    pub skipped: bool,
}

/// Query selecting the answers of one question, or the whole room journal
/// when omitted.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListAnswersQuery {
    /// Question to filter on.
    pub question_id: Option<Uuid>,
}

/// Public projection of an answer row.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerSummary {
    /// Answer identifier.
    pub id: Uuid,
    /// Room the answer belongs to.
    pub room_id: Uuid,
    /// Question the answer responds to.
    pub question_id: Uuid,
    /// Name of the submitting player.
    pub player_name: String,
    /// Free-text answer; `None` when skipped.
    pub answer: Option<String>,
    /// Whether the player passed.
    pub skipped: bool,
    /// RFC3339 creation timestamp.
    pub created_at: String,
}

impl From<AnswerEntity> for AnswerSummary {
    fn from(answer: AnswerEntity) -> Self {
        Self {
            id: answer.id,
            room_id: answer.room_id,
            question_id: answer.question_id,
            player_name: answer.player_name,
            answer: answer.answer,
            skipped: answer.skipped,
            created_at: format_system_time(answer.created_at),
        }
    }
}
