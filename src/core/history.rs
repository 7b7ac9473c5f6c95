//! Conversation history persistence.
//!
//! The store sees the collection as one opaque serialized blob in a fixed
//! slot. A missing or corrupt blob is "no history", never an error the
//! engine has to survive: conversation continuity beats surfacing
//! infrastructure failures.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use directories::ProjectDirs;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::core::conversation::Conversation;

const HISTORY_FILE: &str = "history.json";

pub trait HistoryStore: Send {
    /// Persist the whole collection, replacing any previous blob.
    fn save(&self, conversations: &[Conversation]) -> Result<(), Box<dyn std::error::Error>>;

    /// Load the persisted collection. Absent or unreadable blobs come back
    /// as an empty collection.
    fn load(&self) -> Vec<Conversation>;

    /// Drop the persisted blob.
    fn clear(&self) -> Result<(), Box<dyn std::error::Error>>;
}

/// JSON-file store under the platform data directory.
pub struct FileHistoryStore {
    path: PathBuf,
}

impl FileHistoryStore {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let proj_dirs = ProjectDirs::from("org", "permacommons", "parley")
            .ok_or("failed to determine data directory")?;
        Ok(Self {
            path: proj_dirs.data_dir().join(HISTORY_FILE),
        })
    }

    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl HistoryStore for FileHistoryStore {
    fn save(&self, conversations: &[Conversation]) -> Result<(), Box<dyn std::error::Error>> {
        let parent = match self.path.parent() {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => std::path::Path::new("."),
        };

        // Write-then-rename in the target directory so a crash mid-write
        // never leaves a half-written history behind.
        let mut temp_file = NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut temp_file, conversations)?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&self.path)?;
        Ok(())
    }

    fn load(&self) -> Vec<Conversation> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "could not read history; starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(conversations) => conversations,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "corrupt history blob; starting empty");
                Vec::new()
            }
        }
    }

    fn clear(&self) -> Result<(), Box<dyn std::error::Error>> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory store for tests and incognito-style tooling. Clones share the
/// same slot.
#[derive(Clone, Default)]
pub struct MemoryHistoryStore {
    blob: Arc<Mutex<Option<String>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether anything has ever been saved to this slot.
    pub fn has_blob(&self) -> bool {
        self.blob.lock().unwrap().is_some()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn save(&self, conversations: &[Conversation]) -> Result<(), Box<dyn std::error::Error>> {
        let blob = serde_json::to_string(conversations)?;
        *self.blob.lock().unwrap() = Some(blob);
        Ok(())
    }

    fn load(&self) -> Vec<Conversation> {
        let guard = self.blob.lock().unwrap();
        let Some(blob) = guard.as_deref() else {
            return Vec::new();
        };
        match serde_json::from_str(blob) {
            Ok(conversations) => conversations,
            Err(err) => {
                warn!(%err, "corrupt in-memory history blob; starting empty");
                Vec::new()
            }
        }
    }

    fn clear(&self) -> Result<(), Box<dyn std::error::Error>> {
        *self.blob.lock().unwrap() = None;
        Ok(())
    }
}
