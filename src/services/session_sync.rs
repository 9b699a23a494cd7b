//! Mirror of the shared room row for one client.
//!
//! The mirror is replaced verbatim on every observed change — last writer
//! wins, no client-side merging. Writes go through [`SessionSync::update`]
//! without optimistically mutating the mirror: the local copy only moves
//! when the store echoes the row back, through the change feed or a poll.

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::dao::models::{RecordChange, RoomEntity, RoomPatch};
use crate::dao::record_store::RecordStore;
use crate::error::ServiceError;

/// Owns this client's view of the shared room row.
pub struct SessionSync {
    store: Arc<dyn RecordStore>,
    room_id: Uuid,
    mirror: watch::Sender<RoomEntity>,
}

impl SessionSync {
    /// Start mirroring the given room row.
    pub fn new(store: Arc<dyn RecordStore>, room: RoomEntity) -> Self {
        let room_id = room.id;
        let (mirror, _) = watch::channel(room);
        Self {
            store,
            room_id,
            mirror,
        }
    }

    /// Identifier of the mirrored room.
    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    /// Latest observed copy of the room row.
    pub fn current(&self) -> RoomEntity {
        self.mirror.borrow().clone()
    }

    /// Subscribe to mirror replacements.
    pub fn watch(&self) -> watch::Receiver<RoomEntity> {
        self.mirror.subscribe()
    }

    /// Feed one pushed change into the mirror. Changes for other rooms or
    /// other tables are ignored.
    pub fn apply_remote(&self, change: &RecordChange) {
        if let RecordChange::Room(room) = change
            && room.id == self.room_id
        {
            self.replace(room.clone());
        }
    }

    /// Re-fetch the row from the store. Reports a vanished room instead of
    /// silently keeping the stale mirror.
    pub async fn poll_once(&self) -> Result<(), ServiceError> {
        match self.store.find_room(self.room_id).await? {
            Some(room) => {
                self.replace(room);
                Ok(())
            }
            None => Err(ServiceError::NotFound(
                "this room no longer exists".into(),
            )),
        }
    }

    /// Write a partial update to the shared row. Callers only touch fields
    /// they own for the transition they are performing.
    pub async fn update(&self, patch: RoomPatch) -> Result<(), ServiceError> {
        match self.store.update_room(self.room_id, patch).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(
                "this room no longer exists".into(),
            )),
        }
    }

    fn replace(&self, room: RoomEntity) {
        self.mirror.send_if_modified(|current| {
            if *current == room {
                false
            } else {
                *current = room;
                true
            }
        });
    }
}
