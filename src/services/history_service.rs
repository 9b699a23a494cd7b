//! Assembly of the answered-question journal shown by the history overlay.

use std::sync::Arc;
use std::time::SystemTime;

use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

use crate::dao::models::{AnswerEntity, RoomEntity};
use crate::dao::record_store::RecordStore;
use crate::error::ServiceError;
use crate::state::catalog::QuestionCatalog;

/// One player's entry in a history row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLine {
    /// Player the entry belongs to.
    pub player_name: String,
    /// Submitted text; `None` when the player passed.
    pub answer: Option<String>,
    /// Whether the player passed.
    pub skipped: bool,
}

/// Both players' entries for one answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Question the entries answer.
    pub question_id: Uuid,
    /// Question text.
    pub question: String,
    /// Tier the question belongs to.
    pub level: u32,
    /// The creator's entry, when recorded.
    pub player1: Option<HistoryLine>,
    /// The joiner's entry, when recorded.
    pub player2: Option<HistoryLine>,
    /// Timestamp of the earliest answer for this question.
    pub answered_at: SystemTime,
}

/// Fetch and group every answer of a room, oldest question first.
pub async fn room_history(
    store: &Arc<dyn RecordStore>,
    questions: &QuestionCatalog,
    room: &RoomEntity,
) -> Result<Vec<HistoryEntry>, ServiceError> {
    let answers = store.list_room_answers(room.id).await?;

    let mut grouped: IndexMap<Uuid, HistoryEntry> = IndexMap::new();
    for answer in answers {
        let Some(question) = questions.get(answer.question_id) else {
            debug!(question = %answer.question_id, "answer references a question no longer in the catalog");
            continue;
        };

        let entry = grouped
            .entry(answer.question_id)
            .or_insert_with(|| HistoryEntry {
                question_id: answer.question_id,
                question: question.text.clone(),
                level: question.level,
                player1: None,
                player2: None,
                answered_at: answer.created_at,
            });

        let line = line_of(&answer);
        if answer.player_name == room.player1_name {
            entry.player1 = Some(line);
        } else {
            entry.player2 = Some(line);
        }
    }

    Ok(grouped.into_values().collect())
}

fn line_of(answer: &AnswerEntity) -> HistoryLine {
    HistoryLine {
        player_name: answer.player_name.clone(),
        answer: answer.answer.clone(),
        skipped: answer.skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::memory::MemoryStore;
    use crate::dao::models::QuestionEntity;

    fn question(level: u32, sort_order: u32, text: &str) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            text: text.into(),
            level,
            sort_order,
            suggestions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn groups_answers_by_question_with_skips_preserved() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let first = question(1, 1, "first question");
        let second = question(1, 2, "second question");
        let catalog = QuestionCatalog::from_rows(vec![first.clone(), second.clone()]);

        let mut room = RoomEntity::new("ABCDEF".into(), None, "Alex".into());
        room.player2_name = Some("Sam".into());

        for (question_id, player, answer, skipped) in [
            (first.id, "Alex", Some("coffee"), false),
            (first.id, "Sam", None, true),
            (second.id, "Alex", Some("the sea"), false),
        ] {
            store
                .insert_answer(AnswerEntity::new(
                    room.id,
                    question_id,
                    player.into(),
                    answer.map(Into::into),
                    skipped,
                ))
                .await
                .expect("insert");
        }

        let history = room_history(&store, &catalog, &room).await.expect("history");
        assert_eq!(history.len(), 2);

        let entry = &history[0];
        assert_eq!(entry.question, "first question");
        assert_eq!(
            entry.player1.as_ref().and_then(|l| l.answer.as_deref()),
            Some("coffee")
        );
        assert!(entry.player2.as_ref().is_some_and(|l| l.skipped));

        let entry = &history[1];
        assert_eq!(entry.question, "second question");
        assert!(entry.player2.is_none());
    }

    #[tokio::test]
    async fn answers_for_deleted_questions_are_dropped() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let catalog = QuestionCatalog::from_rows(Vec::new());
        let room = RoomEntity::new("ABCDEF".into(), None, "Alex".into());

        store
            .insert_answer(AnswerEntity::new(
                room.id,
                Uuid::new_v4(),
                "Alex".into(),
                Some("orphaned".into()),
                false,
            ))
            .await
            .expect("insert");

        let history = room_history(&store, &catalog, &room).await.expect("history");
        assert!(history.is_empty());
    }
}
