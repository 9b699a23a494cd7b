//! Per-question submission ledger.
//!
//! Holds the answer rows for the room's current question. Freshness comes
//! from two independent producers feeding one deduplicated-by-id sink: an
//! explicit poll (the guaranteed path) and pushed change-feed rows (the
//! optimization). Either can be disabled without breaking the other.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;
use uuid::Uuid;

use crate::dao::models::AnswerEntity;
use crate::dao::record_store::RecordStore;
use crate::dao::storage::StorageResult;
use crate::error::ServiceError;

/// Answer cache scoped to (room, current question).
pub struct AnswerLedger {
    store: Arc<dyn RecordStore>,
    room_id: Uuid,
    inner: RwLock<Scope>,
}

#[derive(Default)]
struct Scope {
    question_id: Option<Uuid>,
    rows: Vec<AnswerEntity>,
}

impl AnswerLedger {
    /// Create an unscoped ledger for a room.
    pub fn new(store: Arc<dyn RecordStore>, room_id: Uuid) -> Self {
        Self {
            store,
            room_id,
            inner: RwLock::new(Scope::default()),
        }
    }

    /// Point the ledger at a different question, clearing the cache when the
    /// pointer actually moved.
    pub fn rescope(&self, question_id: Option<Uuid>) {
        let mut scope = self.write();
        if scope.question_id != question_id {
            scope.question_id = question_id;
            scope.rows.clear();
        }
    }

    /// Question the ledger is currently scoped to.
    pub fn scope(&self) -> Option<Uuid> {
        self.read().question_id
    }

    /// Feed one pushed row into the sink. Rows outside the current scope or
    /// already cached are dropped.
    pub fn apply(&self, row: AnswerEntity) {
        let mut scope = self.write();
        if row.room_id != self.room_id || scope.question_id != Some(row.question_id) {
            return;
        }
        if scope.rows.iter().any(|existing| existing.id == row.id) {
            return;
        }
        scope.rows.push(row);
    }

    /// Fetch the scoped rows from the store and merge them into the sink.
    pub async fn poll_once(&self) -> StorageResult<()> {
        let Some(question_id) = self.scope() else {
            return Ok(());
        };
        let fetched = self.store.list_answers(self.room_id, question_id).await?;
        let mut scope = self.write();
        // The scope may have moved while the fetch was in flight.
        if scope.question_id != Some(question_id) {
            return Ok(());
        }
        for row in fetched {
            if !scope.rows.iter().any(|existing| existing.id == row.id) {
                scope.rows.push(row);
            }
        }
        Ok(())
    }

    /// Record the local player's answer (or skip) for the current question.
    /// A second submission for the same question is a silent no-op.
    pub async fn submit(
        &self,
        player_name: &str,
        answer: Option<String>,
        skipped: bool,
    ) -> Result<(), ServiceError> {
        let Some(question_id) = self.scope() else {
            return Err(ServiceError::InvalidState(
                "no question is currently active".into(),
            ));
        };

        if self.has_answered(player_name) {
            debug!(player = player_name, question = %question_id, "duplicate answer ignored");
            return Ok(());
        }

        self.store
            .insert_answer(AnswerEntity::new(
                self.room_id,
                question_id,
                player_name.to_string(),
                answer,
                skipped,
            ))
            .await?;

        // Re-fetch immediately rather than waiting on the change feed.
        self.poll_once().await?;
        Ok(())
    }

    /// All cached rows for the current question.
    pub fn rows(&self) -> Vec<AnswerEntity> {
        self.read().rows.clone()
    }

    /// Whether the given player has a recorded row for the current question.
    pub fn has_answered(&self, player_name: &str) -> bool {
        self.read()
            .rows
            .iter()
            .any(|row| row.player_name == player_name)
    }

    /// Whether anyone other than the given player has a recorded row.
    pub fn partner_has_answered(&self, player_name: &str) -> bool {
        self.read()
            .rows
            .iter()
            .any(|row| row.player_name != player_name)
    }

    /// The given player's row, if any.
    pub fn answer_of(&self, player_name: &str) -> Option<AnswerEntity> {
        self.read()
            .rows
            .iter()
            .find(|row| row.player_name == player_name)
            .cloned()
    }

    /// The first row belonging to anyone else, if any.
    pub fn partner_answer(&self, player_name: &str) -> Option<AnswerEntity> {
        self.read()
            .rows
            .iter()
            .find(|row| row.player_name != player_name)
            .cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Scope> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Scope> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::memory::MemoryStore;

    fn ledger() -> (AnswerLedger, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let room_id = Uuid::new_v4();
        (AnswerLedger::new(store, room_id), room_id)
    }

    #[tokio::test]
    async fn duplicate_submit_is_a_silent_noop() {
        let (ledger, _room) = ledger();
        let question = Uuid::new_v4();
        ledger.rescope(Some(question));

        ledger
            .submit("Alex", Some("first".into()), false)
            .await
            .expect("submit");
        ledger
            .submit("Alex", Some("second".into()), false)
            .await
            .expect("second submit");

        let rows = ledger.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].answer.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn submit_without_scope_is_rejected() {
        let (ledger, _room) = ledger();
        let err = ledger
            .submit("Alex", Some("text".into()), false)
            .await
            .expect_err("no scope");
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn rescope_clears_the_cache() {
        let (ledger, _room) = ledger();
        let question = Uuid::new_v4();
        ledger.rescope(Some(question));
        ledger
            .submit("Alex", Some("text".into()), false)
            .await
            .expect("submit");
        assert!(ledger.has_answered("Alex"));

        ledger.rescope(Some(Uuid::new_v4()));
        assert!(!ledger.has_answered("Alex"));
        assert!(ledger.rows().is_empty());
    }

    #[tokio::test]
    async fn pushed_rows_outside_scope_are_dropped() {
        let (ledger, room_id) = ledger();
        let question = Uuid::new_v4();
        ledger.rescope(Some(question));

        // Wrong question: dropped.
        ledger.apply(AnswerEntity::new(
            room_id,
            Uuid::new_v4(),
            "Sam".into(),
            Some("stale".into()),
            false,
        ));
        assert!(ledger.rows().is_empty());

        // Matching scope: kept once, even when pushed twice.
        let row = AnswerEntity::new(room_id, question, "Sam".into(), Some("fresh".into()), false);
        ledger.apply(row.clone());
        ledger.apply(row);
        assert_eq!(ledger.rows().len(), 1);
        assert!(ledger.partner_has_answered("Alex"));
    }

    #[tokio::test]
    async fn partner_queries_split_by_name() {
        let (ledger, _room) = ledger();
        let question = Uuid::new_v4();
        ledger.rescope(Some(question));
        ledger
            .submit("Alex", None, true)
            .await
            .expect("skip");

        assert!(ledger.has_answered("Alex"));
        assert!(!ledger.partner_has_answered("Alex"));
        assert!(ledger.partner_has_answered("Sam"));
        assert!(ledger.answer_of("Alex").expect("row").skipped);
        assert!(ledger.partner_answer("Alex").is_none());
    }
}
