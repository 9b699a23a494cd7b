use futures::future::BoxFuture;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, EventResponseEntity, GameEventEntity, QuestionEntity, RecordChange, RoomEntity,
    RoomPatch,
};
use crate::dao::storage::StorageResult;

/// Narrow interface over the shared relation store. Everything the engine
/// does goes through these operations; the backing technology is irrelevant
/// to the callers.
///
/// The change feed returned by [`RecordStore::subscribe`] is best-effort: it
/// may lag or drop under load, so consumers pair it with their own polling
/// and deduplicate by row id.
pub trait RecordStore: Send + Sync {
    /// Persist a new room row, returning the stored copy.
    fn insert_room(&self, room: RoomEntity) -> BoxFuture<'static, StorageResult<RoomEntity>>;

    /// Apply a partial update to a room row. Returns the updated row, or
    /// `None` when no room with that id exists.
    fn update_room(
        &self,
        id: Uuid,
        patch: RoomPatch,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;

    /// Fetch a room row by id.
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;

    /// Fetch a room row by its join code (uppercase-normalized).
    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;

    /// Fetch the subset of the given rooms that still exist, most recently
    /// updated first.
    fn list_rooms(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<RoomEntity>>>;

    /// Persist a new answer row, returning the stored copy.
    fn insert_answer(
        &self,
        answer: AnswerEntity,
    ) -> BoxFuture<'static, StorageResult<AnswerEntity>>;

    /// Fetch the answers recorded for one question of one room.
    fn list_answers(
        &self,
        room_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;

    /// Fetch every answer recorded for a room, oldest first.
    fn list_room_answers(
        &self,
        room_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;

    /// Persist a new event response row, returning the stored copy.
    fn insert_event_response(
        &self,
        response: EventResponseEntity,
    ) -> BoxFuture<'static, StorageResult<EventResponseEntity>>;

    /// Rewrite an existing event response in place. Returns the updated row,
    /// or `None` when no response with that id exists.
    fn update_event_response(
        &self,
        id: Uuid,
        response: Option<String>,
        completed: bool,
    ) -> BoxFuture<'static, StorageResult<Option<EventResponseEntity>>>;

    /// Fetch the responses recorded for one event of one room.
    fn list_event_responses(
        &self,
        room_id: Uuid,
        event_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<EventResponseEntity>>>;

    /// Fetch the question catalog ordered by (level, sort_order).
    fn list_questions(&self) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;

    /// Fetch the event catalog ordered by (level, sort_order).
    fn list_game_events(&self) -> BoxFuture<'static, StorageResult<Vec<GameEventEntity>>>;

    /// Subscribe to the store-wide change feed. Consumers filter by room id.
    fn subscribe(&self) -> BoxFuture<'static, StorageResult<broadcast::Receiver<RecordChange>>>;

    /// Cheap liveness probe used by the health endpoint.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
