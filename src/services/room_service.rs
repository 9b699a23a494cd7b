//! Room creation, joining, and resumption.
//!
//! The record-level functions are shared by the relay routes and the
//! client-side [`RoomDirectory`], which additionally maintains the
//! device-local bookmark list so a returning player can re-list rooms
//! without re-typing a code.

use std::sync::Arc;
use std::time::SystemTime;

use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dao::bookmarks::{BookmarkStore, RoomBookmark};
use crate::dao::models::{RoomEntity, RoomPatch};
use crate::dao::record_store::RecordStore;
use crate::error::ServiceError;

/// Join-code alphabet: 32 symbols, with I, O, 0 and 1 left out so codes
/// survive being read aloud.
const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Fixed length of a join code.
const ROOM_CODE_LENGTH: usize = 6;
/// How many collisions we tolerate before giving up on code generation.
const ROOM_CODE_ATTEMPTS: usize = 5;

/// Generate one candidate join code.
pub fn generate_room_code(rng: &mut impl Rng) -> String {
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let index = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[index] as char
        })
        .collect()
}

/// Create a room with a freshly allocated, collision-checked join code.
pub async fn create_room(
    store: &Arc<dyn RecordStore>,
    player_name: String,
    room_name: Option<String>,
) -> Result<RoomEntity, ServiceError> {
    let mut code = None;
    for _ in 0..ROOM_CODE_ATTEMPTS {
        let candidate = generate_room_code(&mut rand::rng());
        if store.find_room_by_code(candidate.clone()).await?.is_none() {
            code = Some(candidate);
            break;
        }
        debug!(code = %candidate, "room code collision, retrying");
    }
    let Some(code) = code else {
        return Err(ServiceError::Conflict(
            "could not allocate a unique room code, please try again".into(),
        ));
    };

    let room = store
        .insert_room(RoomEntity::new(code, room_name, player_name))
        .await?;
    info!(room = %room.id, code = %room.room_code, "room created");
    Ok(room)
}

/// Join a room by its code. The creator re-entering their own room is a
/// reconnect, not a second join; a third distinct name is turned away.
pub async fn join_room(
    store: &Arc<dyn RecordStore>,
    code: &str,
    player_name: &str,
) -> Result<RoomEntity, ServiceError> {
    let code = code.trim().to_uppercase();
    let Some(room) = store.find_room_by_code(code).await? else {
        return Err(ServiceError::NotFound(
            "no room matches that code, check it and try again".into(),
        ));
    };

    if let Some(player2) = room.player2_name.as_deref()
        && player2 != player_name
        && room.player1_name != player_name
    {
        return Err(ServiceError::Conflict(
            "that room already has two players".into(),
        ));
    }

    let patch = if room.player1_name == player_name {
        RoomPatch {
            player1_connected: Some(true),
            ..RoomPatch::default()
        }
    } else {
        RoomPatch {
            player2_name: Some(player_name.to_string()),
            player2_connected: Some(true),
            ..RoomPatch::default()
        }
    };

    store
        .update_room(room.id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("this room no longer exists".into()))
}

/// Reconnect a returning player to a room by id.
pub async fn resume_room(
    store: &Arc<dyn RecordStore>,
    room_id: Uuid,
    player_name: &str,
) -> Result<RoomEntity, ServiceError> {
    let Some(room) = store.find_room(room_id).await? else {
        return Err(ServiceError::NotFound("this room no longer exists".into()));
    };

    let patch = if room.player1_name == player_name {
        RoomPatch {
            player1_connected: Some(true),
            ..RoomPatch::default()
        }
    } else {
        RoomPatch {
            player2_connected: Some(true),
            ..RoomPatch::default()
        }
    };

    store
        .update_room(room.id, patch)
        .await?
        .ok_or_else(|| ServiceError::NotFound("this room no longer exists".into()))
}

/// Fetch the still-existing rooms among the given ids, newest activity
/// first.
pub async fn lookup_rooms(
    store: &Arc<dyn RecordStore>,
    ids: Vec<Uuid>,
) -> Result<Vec<RoomEntity>, ServiceError> {
    Ok(store.list_rooms(ids).await?)
}

/// Client-side room directory: the record operations above plus the
/// device-local bookmark bookkeeping.
pub struct RoomDirectory {
    store: Arc<dyn RecordStore>,
    bookmarks: BookmarkStore,
}

impl RoomDirectory {
    /// Build a directory over a store and a bookmark file.
    pub fn new(store: Arc<dyn RecordStore>, bookmarks: BookmarkStore) -> Self {
        Self { store, bookmarks }
    }

    /// Create a room and bookmark it for this device.
    pub async fn create_room(
        &self,
        player_name: &str,
        room_name: Option<String>,
    ) -> Result<RoomEntity, ServiceError> {
        let room = create_room(&self.store, player_name.to_string(), room_name).await?;
        self.bookmark(&room, player_name);
        Ok(room)
    }

    /// Join (or reconnect to) a room by code and bookmark it.
    pub async fn join_room(
        &self,
        code: &str,
        player_name: &str,
    ) -> Result<RoomEntity, ServiceError> {
        let room = join_room(&self.store, code, player_name).await?;
        self.bookmark(&room, player_name);
        Ok(room)
    }

    /// Resume a bookmarked room. A vanished room prunes its bookmark before
    /// reporting the failure.
    pub async fn resume_room(
        &self,
        room_id: Uuid,
        player_name: &str,
    ) -> Result<RoomEntity, ServiceError> {
        match resume_room(&self.store, room_id, player_name).await {
            Ok(room) => {
                self.bookmark(&room, player_name);
                Ok(room)
            }
            Err(err) => {
                if matches!(err, ServiceError::NotFound(_)) {
                    self.bookmarks.remove(room_id);
                }
                Err(err)
            }
        }
    }

    /// Cross-reference bookmarks with live rows: prune bookmarks whose room
    /// vanished and return the surviving rooms by recency.
    pub async fn my_rooms(&self) -> Result<Vec<RoomEntity>, ServiceError> {
        let bookmarked = self.bookmarks.load();
        if bookmarked.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = bookmarked.iter().map(|entry| entry.room_id).collect();
        let rooms = lookup_rooms(&self.store, ids).await?;

        for entry in &bookmarked {
            if !rooms.iter().any(|room| room.id == entry.room_id) {
                self.bookmarks.remove(entry.room_id);
            }
        }

        Ok(rooms)
    }

    /// Forget a room on this device. The shared row is left untouched; there
    /// is no disconnect protocol.
    pub fn leave_room(&self, room_id: Uuid) {
        self.bookmarks.remove(room_id);
    }

    fn bookmark(&self, room: &RoomEntity, player_name: &str) {
        self.bookmarks.record(RoomBookmark {
            room_id: room.id,
            room_code: room.room_code.clone(),
            player_name: player_name.to_string(),
            room_name: room.room_name.clone(),
            last_access: SystemTime::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::memory::MemoryStore;
    use crate::dao::models::RoomStatus;
    use std::env;

    fn shared_store() -> Arc<dyn RecordStore> {
        Arc::new(MemoryStore::new())
    }

    fn scratch_bookmarks(tag: &str) -> BookmarkStore {
        BookmarkStore::new(
            env::temp_dir().join(format!("duet-directory-{tag}-{}.json", Uuid::new_v4())),
        )
    }

    #[test]
    fn generated_codes_avoid_confusable_symbols() {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), 6);
            assert!(
                code.chars().all(|c| !"IO01".contains(c)),
                "confusable symbol in {code}"
            );
        }
    }

    #[tokio::test]
    async fn create_then_join_fills_both_slots() {
        let store = shared_store();
        let created = create_room(&store, "Alex".into(), Some("date night".into()))
            .await
            .expect("create");
        assert_eq!(created.status, RoomStatus::Waiting);
        assert!(created.player1_connected);
        assert_eq!(created.player2_name, None);

        let joined = join_room(&store, &created.room_code, "Sam")
            .await
            .expect("join");
        assert_eq!(joined.player2_name.as_deref(), Some("Sam"));
        assert!(joined.both_connected());
    }

    #[tokio::test]
    async fn join_is_case_insensitive_on_the_code() {
        let store = shared_store();
        let created = create_room(&store, "Alex".into(), None).await.expect("create");
        let joined = join_room(&store, &created.room_code.to_lowercase(), "Sam")
            .await
            .expect("join");
        assert_eq!(joined.id, created.id);
    }

    #[tokio::test]
    async fn third_player_is_turned_away() {
        let store = shared_store();
        let created = create_room(&store, "Alex".into(), None).await.expect("create");
        join_room(&store, &created.room_code, "Sam").await.expect("join");

        let err = join_room(&store, &created.room_code, "Noa")
            .await
            .expect_err("room is full");
        assert!(matches!(err, ServiceError::Conflict(_)));

        // The rejected join must leave the room untouched.
        let room = store
            .find_room(created.id)
            .await
            .expect("find")
            .expect("room exists");
        assert_eq!(room.player2_name.as_deref(), Some("Sam"));
    }

    #[tokio::test]
    async fn creator_joining_again_is_a_reconnect() {
        let store = shared_store();
        let created = create_room(&store, "Alex".into(), None).await.expect("create");
        let rejoined = join_room(&store, &created.room_code, "Alex")
            .await
            .expect("reconnect");
        // Still nobody in the second slot.
        assert_eq!(rejoined.player2_name, None);
        assert!(rejoined.player1_connected);
    }

    #[tokio::test]
    async fn unknown_code_is_not_found_and_writes_no_bookmark() {
        let store = shared_store();
        let directory = RoomDirectory::new(store, scratch_bookmarks("unknown"));

        let err = directory
            .join_room("WRONGX", "Sam")
            .await
            .expect_err("no such room");
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(directory.my_rooms().await.expect("my rooms").is_empty());
    }

    #[tokio::test]
    async fn my_rooms_prunes_vanished_rooms() {
        let store = shared_store();
        let directory = RoomDirectory::new(store.clone(), scratch_bookmarks("prune"));

        let kept = directory
            .create_room("Alex", None)
            .await
            .expect("create kept");
        let doomed = directory
            .create_room("Alex", None)
            .await
            .expect("create doomed");

        // Simulate the room disappearing server-side: the memory store has
        // no delete operation, so re-point the bookmark at a dead id.
        directory.leave_room(doomed.id);
        directory.bookmarks.record(RoomBookmark {
            room_id: Uuid::new_v4(),
            room_code: "GONEXX".into(),
            player_name: "Alex".into(),
            room_name: None,
            last_access: SystemTime::now(),
        });

        let rooms = directory.my_rooms().await.expect("my rooms");
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].id, kept.id);
        // The dead bookmark is gone on the next read.
        assert_eq!(directory.bookmarks.load().len(), 1);
    }

    #[tokio::test]
    async fn resume_of_vanished_room_prunes_the_bookmark() {
        let store = shared_store();
        let directory = RoomDirectory::new(store, scratch_bookmarks("resume"));
        let ghost = Uuid::new_v4();
        directory.bookmarks.record(RoomBookmark {
            room_id: ghost,
            room_code: "GHOSTX".into(),
            player_name: "Alex".into(),
            room_name: None,
            last_access: SystemTime::now(),
        });

        let err = directory
            .resume_room(ghost, "Alex")
            .await
            .expect_err("room gone");
        assert!(matches!(err, ServiceError::NotFound(_)));
        assert!(directory.bookmarks.load().is_empty());
    }
}
