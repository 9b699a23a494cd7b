//! Read-only views over the question and event catalogs.
//!
//! Both catalogs are fetched once per client and kept in play order. The
//! successor of a question is always taken from the single global
//! (level, sort_order) sequence, so the last question of a tier has a
//! well-defined successor in the next tier and only the last question of
//! the whole catalog has none.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::dao::models::{GameEventEntity, QuestionEntity};
use crate::dao::record_store::RecordStore;
use crate::dao::storage::StorageResult;

/// Ordered question catalog keyed by id.
#[derive(Debug, Clone, Default)]
pub struct QuestionCatalog {
    questions: IndexMap<Uuid, QuestionEntity>,
}

impl QuestionCatalog {
    /// Build a catalog from rows already in (level, sort_order) order.
    pub fn from_rows(rows: Vec<QuestionEntity>) -> Self {
        Self {
            questions: rows.into_iter().map(|q| (q.id, q)).collect(),
        }
    }

    /// Fetch the catalog from the store.
    pub async fn load(store: &dyn RecordStore) -> StorageResult<Self> {
        Ok(Self::from_rows(store.list_questions().await?))
    }

    /// Number of questions in the catalog.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// True when the catalog holds no questions at all.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// First question of the global sequence (tier 1, lowest order).
    pub fn first(&self) -> Option<&QuestionEntity> {
        self.questions.values().next()
    }

    /// Look a question up by id.
    pub fn get(&self, id: Uuid) -> Option<&QuestionEntity> {
        self.questions.get(&id)
    }

    /// The question immediately following `current` in the global sequence,
    /// crossing tier boundaries. `None` means the catalog is exhausted (or
    /// `current` is unknown, e.g. the question was deleted mid-game).
    pub fn next_after(&self, current: Uuid) -> Option<&QuestionEntity> {
        let index = self.questions.get_index_of(&current)?;
        self.questions.get_index(index + 1).map(|(_, q)| q)
    }
}

/// Ordered bonus-event catalog keyed by id.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: IndexMap<Uuid, GameEventEntity>,
}

impl EventCatalog {
    /// Build a catalog from rows already in (level, sort_order) order.
    pub fn from_rows(rows: Vec<GameEventEntity>) -> Self {
        Self {
            events: rows.into_iter().map(|e| (e.id, e)).collect(),
        }
    }

    /// Fetch the catalog from the store.
    pub async fn load(store: &dyn RecordStore) -> StorageResult<Self> {
        Ok(Self::from_rows(store.list_game_events().await?))
    }

    /// Look an event definition up by id.
    pub fn get(&self, id: Uuid) -> Option<&GameEventEntity> {
        self.events.get(&id)
    }

    /// All event definitions, in catalog order.
    pub fn all(&self) -> impl Iterator<Item = &GameEventEntity> {
        self.events.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(level: u32, sort_order: u32, text: &str) -> QuestionEntity {
        QuestionEntity {
            id: Uuid::new_v4(),
            text: text.into(),
            level,
            sort_order,
            suggestions: Vec::new(),
        }
    }

    fn catalog() -> (QuestionCatalog, Vec<Uuid>) {
        let rows = vec![
            question(1, 1, "first"),
            question(1, 2, "second"),
            question(2, 1, "third"),
            question(2, 2, "fourth"),
        ];
        let ids = rows.iter().map(|q| q.id).collect();
        (QuestionCatalog::from_rows(rows), ids)
    }

    #[test]
    fn successor_crosses_tier_boundary() {
        let (catalog, ids) = catalog();
        let next = catalog.next_after(ids[1]).expect("successor");
        assert_eq!(next.id, ids[2]);
        assert_eq!(next.level, 2);
    }

    #[test]
    fn successor_within_tier() {
        let (catalog, ids) = catalog();
        assert_eq!(catalog.next_after(ids[0]).map(|q| q.id), Some(ids[1]));
    }

    #[test]
    fn last_question_has_no_successor() {
        let (catalog, ids) = catalog();
        assert!(catalog.next_after(ids[3]).is_none());
    }

    #[test]
    fn unknown_question_has_no_successor() {
        let (catalog, _) = catalog();
        assert!(catalog.next_after(Uuid::new_v4()).is_none());
    }

    #[test]
    fn first_is_tier_one_order_one() {
        let (catalog, ids) = catalog();
        assert_eq!(catalog.first().map(|q| q.id), Some(ids[0]));
    }
}
