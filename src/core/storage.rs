//! Key-Value Storage
//!
//! Small persistent store that survives page reloads. Used only for redirect-state records.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LifecycleError, StorageError};

/// Persistent key-value storage interface.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Value>, LifecycleError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Value) -> Result<(), LifecycleError>;

    /// Delete the value stored under `key`.
    fn remove(&self, key: &str) -> Result<bool, LifecycleError>;
}

/// In-memory key-value store.
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    values: Mutex<HashMap<String, Value>>,
}

impl InMemoryKeyValueStore {
    /// Create new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, LifecycleError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), LifecycleError> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, LifecycleError> {
        Ok(self.values.lock().remove(key).is_some())
    }
}

/// Key-value store persisted as a single JSON object on disk.
pub struct FileKeyValueStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Create store backed by the file at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, LifecycleError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            LifecycleError::Storage(StorageError::ReadFailed {
                message: format!("{}: {}", self.path.display(), e),
            })
        })?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(LifecycleError::Storage(StorageError::CorruptedData {
                message: format!("{} does not hold a JSON object", self.path.display()),
            })),
            Err(e) => Err(LifecycleError::Storage(StorageError::CorruptedData {
                message: e.to_string(),
            })),
        }
    }

    fn write_all(&self, values: &Map<String, Value>) -> Result<(), LifecycleError> {
        let write_failed = |message: String| {
            LifecycleError::Storage(StorageError::WriteFailed { message })
        };

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| write_failed(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(values).map_err(|e| write_failed(e.to_string()))?;
        fs::write(&self.path, content).map_err(|e| write_failed(e.to_string()))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, LifecycleError> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), LifecycleError> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value);
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> Result<bool, LifecycleError> {
        let _guard = self.lock.lock();
        let mut values = self.read_all()?;
        let removed = values.remove(key).is_some();
        if removed {
            self.write_all(&values)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join("oauth2-lifecycle-tests")
            .join(format!("{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_in_memory_store() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", json!([1, 2])).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!([1, 2])));

        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let path = temp_path();
        {
            let store = FileKeyValueStore::new(&path);
            store.set("xhOAuthState", json!([{"key": "a"}])).unwrap();
            store.set("other", json!(true)).unwrap();
        }

        let reopened = FileKeyValueStore::new(&path);
        assert_eq!(
            reopened.get("xhOAuthState").unwrap(),
            Some(json!([{"key": "a"}]))
        );
        assert!(reopened.remove("other").unwrap());
        assert!(reopened.get("other").unwrap().is_none());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_missing_file_is_empty() {
        let store = FileKeyValueStore::new(temp_path());
        assert!(store.get("anything").unwrap().is_none());
        assert!(!store.remove("anything").unwrap());
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let path = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        let store = FileKeyValueStore::new(&path);
        let err = store.get("k").unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Storage(StorageError::CorruptedData { .. })
        ));

        let _ = fs::remove_file(&path);
    }
}
