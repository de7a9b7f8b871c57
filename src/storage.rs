//! Durable client-side key-value storage
//!
//! Persisted state (recent searches, view mode) lives under fixed,
//! namespaced keys. `FileStore` keeps every key in one JSON object on
//! disk and rewrites it on each mutation.

use crate::error::{StorageError, StorageResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const RECENT_SEARCHES_KEY: &str = "storefront.recentSearches";
pub const VIEW_MODE_KEY: &str = "storefront.viewMode";

#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Process-local store, used by tests and when no state file is wanted
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.remove(key);
        Ok(())
    }
}

/// JSON file backed store. The file is read lazily and written through on
/// every `set`/`remove`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<Option<BTreeMap<String, String>>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            values: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(StorageError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, values: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let content = serde_json::to_string_pretty(values)?;
        // Staged write, then rename into place
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, content).map_err(|source| StorageError::Io {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Move an unreadable state file out of the way so the next write
    /// starts a fresh document.
    fn set_aside_corrupt(&self, error: &serde_json::Error) {
        let corrupt = self.path.with_extension("json.corrupt");
        log::warn!(
            "State file {} is not valid JSON ({}), moving it to {}",
            self.path.display(),
            error,
            corrupt.display()
        );
        if let Err(e) = fs::rename(&self.path, &corrupt) {
            log::warn!("Failed to move corrupt state file aside: {}", e);
        }
    }

    fn with_values<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, String>) -> R,
    ) -> StorageResult<R> {
        let mut guard = self.values.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_none() {
            let loaded = match self.load() {
                Err(StorageError::Json(e)) => {
                    self.set_aside_corrupt(&e);
                    BTreeMap::new()
                }
                other => other?,
            };
            *guard = Some(loaded);
        }
        match guard.as_mut() {
            Some(values) => Ok(f(values)),
            None => Ok(f(&mut BTreeMap::new())),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.with_values(|values| values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let snapshot = self.with_values(|values| {
            values.insert(key.to_string(), value.to_string());
            values.clone()
        })?;
        self.write(&snapshot)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let snapshot = self.with_values(|values| {
            values.remove(key);
            values.clone()
        })?;
        self.write(&snapshot)
    }
}
