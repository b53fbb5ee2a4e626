// Storage module - flat-file JSON persistence for the two collections
//
// Each collection lives in its own pretty-printed JSON file:
//   data/habits.json   - array of Habit
//   data/entries.json  - array of Entry
//
// Pretty-printing keeps the files hand-editable and diffable, which is how
// the data has always been managed. There is no locking: every request does
// a full read-modify-write and the last writer wins. That is fine for the
// single-user deployments this serves.
//
// A missing file reads as an empty collection ("no data yet"). An unreadable
// or corrupt file is a hard error - callers must be able to tell a fresh
// install apart from broken storage.

use crate::models::{Entry, Habit};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File stem for the habits collection
const HABITS: &str = "habits";
/// File stem for the entries collection
const ENTRIES: &str = "entries";

/// Errors from loading or saving a collection file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Flat-file JSON store for the habit and entry collections
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
    /// Optional best-effort replica directory. Writes to it happen off the
    /// request path and never fail the primary save.
    mirror_dir: Option<PathBuf>,
}

impl JsonStore {
    pub fn new(data_dir: PathBuf, mirror_dir: Option<PathBuf>) -> Self {
        Self {
            data_dir,
            mirror_dir,
        }
    }

    pub fn load_habits(&self) -> Result<Vec<Habit>, StoreError> {
        self.load(HABITS)
    }

    pub fn save_habits(&self, habits: &[Habit]) -> Result<(), StoreError> {
        self.save(HABITS, habits)
    }

    pub fn load_entries(&self) -> Result<Vec<Entry>, StoreError> {
        self.load(ENTRIES)
    }

    pub fn save_entries(&self, entries: &[Entry]) -> Result<(), StoreError> {
        self.save(ENTRIES, entries)
    }

    fn collection_path(dir: &Path, collection: &str) -> PathBuf {
        dir.join(format!("{}.json", collection))
    }

    /// Load a collection. Missing file means the collection simply hasn't
    /// been written yet and reads as empty; anything else is an error.
    fn load<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        let path = Self::collection_path(&self.data_dir, collection);

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Read { path, source: e }),
        };

        // An empty file also reads as an empty collection
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| StoreError::Parse { path, source: e })
    }

    /// Save a collection as pretty-printed JSON, creating the data directory
    /// if needed. On success, kicks off the mirror write (if configured).
    fn save<T: Serialize>(&self, collection: &str, records: &[T]) -> Result<(), StoreError> {
        let path = Self::collection_path(&self.data_dir, collection);

        fs::create_dir_all(&self.data_dir).map_err(|e| StoreError::Write {
            path: path.clone(),
            source: e,
        })?;

        let json = serde_json::to_string_pretty(records).map_err(|e| StoreError::Write {
            path: path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })?;

        fs::write(&path, &json).map_err(|e| StoreError::Write { path, source: e })?;

        if let Some(mirror_dir) = &self.mirror_dir {
            Self::mirror_write(mirror_dir.clone(), collection.to_string(), json);
        }

        Ok(())
    }

    /// Replicate a successful save to the mirror directory on a detached
    /// thread. Failures are logged and swallowed - the primary write has
    /// already succeeded and the mirror is not a correctness requirement.
    fn mirror_write(mirror_dir: PathBuf, collection: String, json: String) {
        std::thread::spawn(move || {
            let path = Self::collection_path(&mirror_dir, &collection);
            let result = fs::create_dir_all(&mirror_dir).and_then(|_| fs::write(&path, json));
            if let Err(e) = result {
                tracing::warn!("Mirror write to {:?} failed: {}", path, e);
            }
        });
    }
}
