//! Durable storage for the task list.
//!
//! Storage is a plain string-keyed slot ([`KeyValueStore`]); the
//! [`TaskRepository`] on top of it owns the JSON layout. The whole task list
//! lives under a single key as
//!
//! ```json
//! {"version": 1, "tasks": [ ... ]}
//! ```
//!
//! A bare JSON array of tasks (the unversioned layout) is still accepted on read.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use taskmaster_core::types::Task;
use thiserror::Error;

/// Schema version written by this build
pub const SCHEMA_VERSION: u32 = 1;

/// Errors that can occur while reading or writing persisted tasks
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Filesystem failure
    #[error("I/O error on '{key}': {source}")]
    Io {
        /// Storage key being accessed
        key: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Stored value is not valid task JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value was written by a newer schema
    #[error("Unsupported schema version {found} (this build reads up to {supported})")]
    UnsupportedVersion {
        /// Version found in storage
        found: u32,
        /// Highest version this build understands
        supported: u32,
    },

    /// Key cannot be used as a storage slot name
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    /// Backend cannot be used right now
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A string-keyed storage slot
///
/// Implementations must be `Send + Sync`; the store calls them from async tasks.
pub trait KeyValueStore: Send + Sync {
    /// Reads a value; `Ok(None)` when the key was never written or was removed
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Writes a value, replacing any previous one
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Deletes a value; removing a missing key is not an error
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`; the directory is created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn io_error(key: &str, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
            Err(error) => Err(Self::io_error(key, error)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| Self::io_error(key, e))?;

        // Write-then-rename so a crash never leaves a half-written file behind.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|e| Self::io_error(key, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| Self::io_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(Self::io_error(key, error)),
        }
    }
}

/// Process-local storage; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PersistenceError> {
        self.slots
            .lock()
            .map_err(|_| PersistenceError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.slots()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.slots()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.slots()?.remove(key);
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u32,
    tasks: &'a [Task],
}

/// Records stay undecoded until the version has been checked
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTasks {
    Versioned {
        version: u32,
        tasks: serde_json::Value,
    },
    Unversioned(Vec<Task>),
}

/// Reads and writes the task list under one fixed key
#[derive(Clone)]
pub struct TaskRepository {
    backend: Arc<dyn KeyValueStore>,
    key: String,
}

impl TaskRepository {
    /// Creates a repository storing tasks under `key`
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Storage key in use
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the task list; `Ok(None)` when nothing has been saved yet
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the backend fails, the stored value is
    /// not task JSON, or it carries a schema version newer than [`SCHEMA_VERSION`].
    pub fn load(&self) -> Result<Option<Vec<Task>>, PersistenceError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(None);
        };

        match serde_json::from_str::<StoredTasks>(&raw)? {
            StoredTasks::Versioned { version, .. } if version > SCHEMA_VERSION => {
                Err(PersistenceError::UnsupportedVersion {
                    found: version,
                    supported: SCHEMA_VERSION,
                })
            },
            StoredTasks::Versioned { tasks, .. } => Ok(Some(serde_json::from_value(tasks)?)),
            StoredTasks::Unversioned(tasks) => Ok(Some(tasks)),
        }
    }

    /// Saves the whole task list
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when serialization or the backend write fails.
    pub fn save(&self, tasks: &[Task]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(&Envelope {
            version: SCHEMA_VERSION,
            tasks,
        })?;
        self.backend.set(&self.key, &json)
    }

    /// Deletes the saved task list
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] when the backend write fails.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.backend.remove(&self.key)
    }
}

impl std::fmt::Debug for TaskRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRepository")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
