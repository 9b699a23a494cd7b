//! In-memory record store backing the relay server and the test suites.

use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, EventResponseEntity, GameEventEntity, QuestionEntity, RecordChange, RoomEntity,
    RoomPatch,
};
use crate::dao::record_store::RecordStore;
use crate::dao::storage::StorageResult;

/// Capacity of the change-feed channel. Slow subscribers lag and fall back
/// to polling rather than blocking writers.
const CHANGE_FEED_CAPACITY: usize = 64;

/// Record store holding every table in process memory.
///
/// Writes are visible to readers immediately and echoed on the change feed,
/// which makes this backend double as the deterministic substrate for the
/// engine tests: two clients sharing one `MemoryStore` observe each other
/// exactly like two browsers sharing one remote store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Tables>,
}

struct Tables {
    rooms: DashMap<Uuid, RoomEntity>,
    answers: DashMap<Uuid, AnswerEntity>,
    responses: DashMap<Uuid, EventResponseEntity>,
    questions: RwLock<Vec<QuestionEntity>>,
    events: RwLock<Vec<GameEventEntity>>,
    changes: broadcast::Sender<RecordChange>,
}

impl Tables {
    fn notify(&self, change: RecordChange) {
        // Nobody listening is fine; the feed is an optimization over polling.
        let _ = self.changes.send(change);
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            inner: Arc::new(Tables {
                rooms: DashMap::new(),
                answers: DashMap::new(),
                responses: DashMap::new(),
                questions: RwLock::new(Vec::new()),
                events: RwLock::new(Vec::new()),
                changes,
            }),
        }
    }

    /// Install the read-only catalogs, replacing any previous content. Both
    /// lists are kept sorted by (level, sort_order) so list queries return
    /// the global play sequence directly.
    pub fn seed_catalog(&self, mut questions: Vec<QuestionEntity>, mut events: Vec<GameEventEntity>) {
        questions.sort_by_key(|q| (q.level, q.sort_order));
        events.sort_by_key(|e| (e.level, e.sort_order));
        *self.inner.questions.write().unwrap_or_else(PoisonError::into_inner) = questions;
        *self.inner.events.write().unwrap_or_else(PoisonError::into_inner) = events;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<RoomEntity>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            tables.rooms.insert(room.id, room.clone());
            tables.notify(RecordChange::Room(room.clone()));
            Ok(room)
        })
    }

    fn update_room(
        &self,
        id: Uuid,
        patch: RoomPatch,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            let updated = tables.rooms.get_mut(&id).map(|mut entry| {
                entry.apply(patch);
                entry.clone()
            });
            if let Some(room) = &updated {
                tables.notify(RecordChange::Room(room.clone()));
            }
            Ok(updated)
        })
    }

    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move { Ok(tables.rooms.get(&id).map(|entry| entry.clone())) })
    }

    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            Ok(tables
                .rooms
                .iter()
                .find(|entry| entry.room_code.eq_ignore_ascii_case(&code))
                .map(|entry| entry.clone()))
        })
    }

    fn list_rooms(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<RoomEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            let mut rooms: Vec<RoomEntity> = ids
                .into_iter()
                .filter_map(|id| tables.rooms.get(&id).map(|entry| entry.clone()))
                .collect();
            rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(rooms)
        })
    }

    fn insert_answer(
        &self,
        answer: AnswerEntity,
    ) -> BoxFuture<'static, StorageResult<AnswerEntity>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            tables.answers.insert(answer.id, answer.clone());
            tables.notify(RecordChange::Answer(answer.clone()));
            Ok(answer)
        })
    }

    fn list_answers(
        &self,
        room_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            let mut rows: Vec<AnswerEntity> = tables
                .answers
                .iter()
                .filter(|row| row.room_id == room_id && row.question_id == question_id)
                .map(|row| row.clone())
                .collect();
            rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(rows)
        })
    }

    fn list_room_answers(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            let mut rows: Vec<AnswerEntity> = tables
                .answers
                .iter()
                .filter(|row| row.room_id == room_id)
                .map(|row| row.clone())
                .collect();
            rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(rows)
        })
    }

    fn insert_event_response(
        &self,
        response: EventResponseEntity,
    ) -> BoxFuture<'static, StorageResult<EventResponseEntity>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            tables.responses.insert(response.id, response.clone());
            tables.notify(RecordChange::EventResponse(response.clone()));
            Ok(response)
        })
    }

    fn update_event_response(
        &self,
        id: Uuid,
        response: Option<String>,
        completed: bool,
    ) -> BoxFuture<'static, StorageResult<Option<EventResponseEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            let updated = tables.responses.get_mut(&id).map(|mut entry| {
                entry.response = response;
                entry.completed = completed;
                entry.clone()
            });
            if let Some(row) = &updated {
                tables.notify(RecordChange::EventResponse(row.clone()));
            }
            Ok(updated)
        })
    }

    fn list_event_responses(
        &self,
        room_id: Uuid,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EventResponseEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            let mut rows: Vec<EventResponseEntity> = tables
                .responses
                .iter()
                .filter(|row| row.room_id == room_id && row.event_id == event_id)
                .map(|row| row.clone())
                .collect();
            rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(rows)
        })
    }

    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move {
            Ok(tables
                .questions
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone())
        })
    }

    fn list_game_events(&self) -> BoxFuture<'static, StorageResult<Vec<GameEventEntity>>> {
        let tables = self.inner.clone();
        Box::pin(async move { Ok(tables.events.read().unwrap_or_else(PoisonError::into_inner).clone()) })
    }

    fn subscribe(&self) -> BoxFuture<'static, StorageResult<broadcast::Receiver<RecordChange>>> {
        let tables = self.inner.clone();
        Box::pin(async move { Ok(tables.changes.subscribe()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
