//! Per-event response ledger.
//!
//! Mirrors the answer ledger but for bonus events, with two differences: a
//! player's response may be rewritten in place (an event can be re-entered
//! after a reload before both sides finish), and the "has responded"
//! queries additionally require the `completed` flag, so a mid-flow partial
//! response is never mistaken for a finished one.

use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

use crate::dao::models::EventResponseEntity;
use crate::dao::record_store::RecordStore;
use crate::dao::storage::StorageResult;
use crate::error::ServiceError;

/// Response cache scoped to (room, current event).
pub struct EventResponseLedger {
    store: Arc<dyn RecordStore>,
    room_id: Uuid,
    inner: RwLock<Scope>,
}

#[derive(Default)]
struct Scope {
    event_id: Option<Uuid>,
    rows: Vec<EventResponseEntity>,
}

impl EventResponseLedger {
    /// Create an unscoped ledger for a room.
    pub fn new(store: Arc<dyn RecordStore>, room_id: Uuid) -> Self {
        Self {
            store,
            room_id,
            inner: RwLock::new(Scope::default()),
        }
    }

    /// Point the ledger at a different event, clearing the cache when the
    /// pointer actually moved. Rescoping to `None` is the reset that keeps a
    /// stale partner response from leaking into the next event.
    pub fn rescope(&self, event_id: Option<Uuid>) {
        let mut scope = self.write();
        if scope.event_id != event_id {
            scope.event_id = event_id;
            scope.rows.clear();
        }
    }

    /// Event the ledger is currently scoped to.
    pub fn scope(&self) -> Option<Uuid> {
        self.read().event_id
    }

    /// Feed one pushed row into the sink. Updated rows replace their cached
    /// version; rows outside the scope are dropped.
    pub fn apply(&self, row: EventResponseEntity) {
        let mut scope = self.write();
        if row.room_id != self.room_id || scope.event_id != Some(row.event_id) {
            return;
        }
        match scope.rows.iter_mut().find(|existing| existing.id == row.id) {
            Some(existing) => *existing = row,
            None => scope.rows.push(row),
        }
    }

    /// Fetch the scoped rows from the store and merge them into the sink.
    pub async fn poll_once(&self) -> StorageResult<()> {
        let Some(event_id) = self.scope() else {
            return Ok(());
        };
        let fetched = self.store.list_event_responses(self.room_id, event_id).await?;
        let mut scope = self.write();
        if scope.event_id != Some(event_id) {
            return Ok(());
        }
        for row in fetched {
            match scope.rows.iter_mut().find(|existing| existing.id == row.id) {
                Some(existing) => *existing = row,
                None => scope.rows.push(row),
            }
        }
        Ok(())
    }

    /// Record or rewrite the local player's response for the given event.
    pub async fn submit(
        &self,
        event_id: Uuid,
        player_name: &str,
        response: Option<String>,
        completed: bool,
    ) -> Result<(), ServiceError> {
        let existing = self
            .read()
            .rows
            .iter()
            .find(|row| row.event_id == event_id && row.player_name == player_name)
            .map(|row| row.id);

        match existing {
            Some(id) => {
                self.store
                    .update_event_response(id, response, completed)
                    .await?;
            }
            None => {
                self.store
                    .insert_event_response(EventResponseEntity::new(
                        self.room_id,
                        event_id,
                        player_name.to_string(),
                        response,
                        completed,
                    ))
                    .await?;
            }
        }

        self.poll_once().await?;
        Ok(())
    }

    /// All cached rows for the current event.
    pub fn rows(&self) -> Vec<EventResponseEntity> {
        self.read().rows.clone()
    }

    /// Whether the given player has a *completed* response.
    pub fn has_responded(&self, player_name: &str) -> bool {
        self.read()
            .rows
            .iter()
            .any(|row| row.player_name == player_name && row.completed)
    }

    /// Whether anyone else has a *completed* response.
    pub fn partner_has_responded(&self, player_name: &str) -> bool {
        self.read()
            .rows
            .iter()
            .any(|row| row.player_name != player_name && row.completed)
    }

    /// The given player's row, completed or not.
    pub fn response_of(&self, player_name: &str) -> Option<EventResponseEntity> {
        self.read()
            .rows
            .iter()
            .find(|row| row.player_name == player_name)
            .cloned()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Scope> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Scope> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
