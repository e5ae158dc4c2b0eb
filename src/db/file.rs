use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Mutex,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored data is malformed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Storage path {0:?} has no file name")]
    InvalidPath(PathBuf),
}

/// A string blob store addressed by key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns Ok(None) if nothing was stored under the key yet
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    async fn put(&self, key: &str, value: String) -> Result<(), PersistenceError>;
}

/// Stores all keys in one JSON object on disk. Every `put` rewrites the whole file.
pub struct JsonFileKvStore {
    path: PathBuf,
}

impl JsonFileKvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, PersistenceError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(BTreeMap::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), PersistenceError> {
        let content = serde_json::to_string_pretty(entries)?;

        // First write to temporary file so we don't lose data if writing fails halfway
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PersistenceError::InvalidPath(self.path.clone()))?;
        let tmppath = self.path.with_file_name(format!("{filename}.temp"));
        tokio::fs::write(&tmppath, content).await?;

        tokio::fs::rename(&tmppath, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for JsonFileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let mut entries = self.read_all().await?;
        Ok(entries.remove(key))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        log::info!("Saving {key}...");
        let mut entries = match self.read_all().await {
            Ok(entries) => entries,
            Err(PersistenceError::Serde(err)) => {
                log::warn!("{:?} is malformed, replacing it: {err}", self.path);
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        entries.insert(key.to_string(), value);
        self.write_all(&entries).await?;
        log::info!("Saving {key}...done");
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store.lock().insert(key.to_string(), value.to_string());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        // A poisoned lock still holds a consistent map; entries are replaced whole.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }
}
