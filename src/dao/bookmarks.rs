//! Device-local list of rooms this player has touched, so a returning
//! player can re-list and resume rooms without re-typing a code. The list
//! is private to one device and never synchronized.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::SystemTime;
use std::{env, fs};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Default location of the bookmark file.
const DEFAULT_BOOKMARKS_PATH: &str = "config/bookmarks.json";
/// Environment variable overriding [`DEFAULT_BOOKMARKS_PATH`].
const BOOKMARKS_PATH_ENV: &str = "DUET_BACK_BOOKMARKS_PATH";
/// Upper bound on remembered rooms; oldest entries fall off.
const MAX_BOOKMARKS: usize = 20;

/// One remembered room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomBookmark {
    /// Identifier of the bookmarked room.
    pub room_id: Uuid,
    /// Join code, kept so the room can be re-listed without a lookup.
    pub room_code: String,
    /// The name this device used to play in the room.
    pub player_name: String,
    /// Display name of the room, when one was set.
    pub room_name: Option<String>,
    /// When this device last touched the room.
    pub last_access: SystemTime,
}

/// JSON-file-backed bookmark list, most recent first.
#[derive(Debug, Clone)]
pub struct BookmarkStore {
    path: PathBuf,
}

impl BookmarkStore {
    /// Create a store reading and writing the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the default path, honoring the env override.
    pub fn from_env() -> Self {
        let path = env::var_os(BOOKMARKS_PATH_ENV)
            .map(PathBuf::from)
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BOOKMARKS_PATH));
        Self::new(path)
    }

    /// Read the bookmark list. A missing or unreadable file is an empty
    /// list, never an error: bookmarks are a convenience cache.
    pub fn load(&self) -> Vec<RoomBookmark> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(path = %self.path.display(), error = %err, "discarding unreadable bookmark file");
                Vec::new()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read bookmarks");
                Vec::new()
            }
        }
    }

    /// Insert or refresh a bookmark, moving it to the front and dropping
    /// anything beyond the cap.
    pub fn record(&self, bookmark: RoomBookmark) {
        let mut rooms = self.load();
        rooms.retain(|entry| entry.room_id != bookmark.room_id);
        rooms.insert(0, bookmark);
        rooms.truncate(MAX_BOOKMARKS);
        self.save(&rooms);
    }

    /// Forget a room, e.g. after leaving it or learning it no longer exists.
    pub fn remove(&self, room_id: Uuid) {
        let mut rooms = self.load();
        rooms.retain(|entry| entry.room_id != room_id);
        self.save(&rooms);
    }

    fn save(&self, rooms: &[RoomBookmark]) {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(err) = fs::create_dir_all(parent)
        {
            warn!(path = %self.path.display(), error = %err, "failed to create bookmark directory");
            return;
        }

        match serde_json::to_string_pretty(rooms) {
            Ok(json) => {
                if let Err(err) = fs::write(&self.path, json) {
                    warn!(path = %self.path.display(), error = %err, "failed to write bookmarks");
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to encode bookmarks");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store(tag: &str) -> BookmarkStore {
        let path = env::temp_dir().join(format!("duet-bookmarks-{tag}-{}.json", Uuid::new_v4()));
        BookmarkStore::new(path)
    }

    fn bookmark(code: &str) -> RoomBookmark {
        RoomBookmark {
            room_id: Uuid::new_v4(),
            room_code: code.into(),
            player_name: "Alex".into(),
            room_name: None,
            last_access: SystemTime::now(),
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = scratch_store("missing");
        assert!(store.load().is_empty());
    }

    #[test]
    fn record_moves_existing_entry_to_front() {
        let store = scratch_store("front");
        let first = bookmark("AAAAAA");
        let second = bookmark("BBBBBB");
        store.record(first.clone());
        store.record(second.clone());
        store.record(first.clone());

        let rooms = store.load();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].room_id, first.room_id);
        assert_eq!(rooms[1].room_id, second.room_id);

        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn list_is_capped() {
        let store = scratch_store("cap");
        for _ in 0..(MAX_BOOKMARKS + 5) {
            store.record(bookmark("CCCCCC"));
        }
        assert_eq!(store.load().len(), MAX_BOOKMARKS);

        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn remove_prunes_only_the_target() {
        let store = scratch_store("remove");
        let keep = bookmark("DDDDDD");
        let drop = bookmark("EEEEEE");
        store.record(keep.clone());
        store.record(drop.clone());
        store.remove(drop.room_id);

        let rooms = store.load();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, keep.room_id);

        let _ = fs::remove_file(&store.path);
    }
}
