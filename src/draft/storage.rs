//! Key-value storage media for the draft slot.
//!
//! The draft store is the only caller. Values are JSON documents addressed by
//! a short key.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::StorageError;

/// A scoped key-value resource holding JSON values.
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError>;

    /// Delete `key`. Returns whether a value was present.
    fn remove(&self, key: &str) -> Result<bool, StorageError>;
}

/// In-process store (tests, embedding in a host that owns persistence).
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.remove(key).is_some())
    }
}

/// One JSON file per key under a directory.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write never leaves a truncated draft behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.base_path.join(format!("{key}.json")))
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.path_for(key)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(key)(e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Decode {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.base_path).map_err(io_error(key))?;

        let body = serde_json::to_string_pretty(value).map_err(|e| StorageError::Decode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(io_error(key))?;
        fs::rename(&tmp, &path).map_err(io_error(key))?;

        debug!(path = %path.display(), "Stored value written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error(key)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert!(store.get("draft").unwrap().is_none());

        store.set("draft", &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(store.get("draft").unwrap(), Some(serde_json::json!({"a": 1})));

        store.set("draft", &serde_json::json!({"a": 2})).unwrap();
        assert_eq!(store.get("draft").unwrap(), Some(serde_json::json!({"a": 2})));

        assert!(store.remove("draft").unwrap());
        assert!(!store.remove("draft").unwrap());
        assert!(store.get("draft").unwrap().is_none());
    }

    #[test]
    fn memory_store_crud() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_crud() {
        let tmp = tempfile::tempdir().unwrap();
        exercise(&FileStore::new(tmp.path()));
    }

    #[test]
    fn file_store_creates_nested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("drafts");
        let store = FileStore::new(&dir);
        store.set("multiStepFormData", &serde_json::json!([])).unwrap();
        assert!(dir.join("multiStepFormData.json").exists());
        assert!(!dir.join("multiStepFormData.json.tmp").exists());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        for key in ["", "../escape", "a/b", "a.b"] {
            assert!(matches!(
                store.set(key, &serde_json::json!(1)),
                Err(StorageError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn file_store_reports_undecodable_content() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("draft.json"), "{not json").unwrap();
        let store = FileStore::new(tmp.path());
        assert!(matches!(
            store.get("draft"),
            Err(StorageError::Decode { .. })
        ));
    }
}
