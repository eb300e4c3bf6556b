//! Durable key-value storage for client state.
//!
//! SYSTEM CONTEXT
//! ==============
//! The auth store persists its profile projection here and the HTTP backend
//! keeps its own session token here. Both go through `load_json`/`save_json`
//! so callers never repeat the serde glue.
//!
//! ERROR HANDLING
//! ==============
//! `load_json` degrades to `None` on missing or malformed data: persisted
//! state is only ever a cold-start placeholder.

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String-valued durable storage addressed by key.
pub trait KeyValueStorage: Send + Sync {
    /// Read the raw value for `key`, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the underlying read fails.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the underlying write fails.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the underlying delete fails.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Load a JSON value stored under `key`.
pub fn load_json<T: DeserializeOwned>(storage: &dyn KeyValueStorage, key: &str) -> Option<T> {
    let raw = match storage.get_item(key) {
        Ok(raw) => raw?,
        Err(e) => {
            debug!(key, error = %e, "storage read failed");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(key, error = %e, "discarding malformed stored value");
            None
        }
    }
}

/// Save a JSON value under `key`.
///
/// # Errors
///
/// Returns an error if encoding or the storage write fails.
pub fn save_json<T: Serialize>(storage: &dyn KeyValueStorage, key: &str, value: &T) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    storage.set_item(key, &raw)
}

fn check_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !key.starts_with('.');
    if valid { Ok(()) } else { Err(StorageError::InvalidKey(key.to_owned())) }
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

/// Process-local storage. Contents vanish at exit.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        check_key(key)?;
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        check_key(key)?;
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        check_key(key)?;
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

// =============================================================================
// FILE STORAGE
// =============================================================================

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Storage rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
