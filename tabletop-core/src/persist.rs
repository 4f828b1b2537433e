//! Map persistence.
//!
//! The whole [`MapData`] is stored as a single JSON snapshot under one
//! well-known key in a [`KeyValueStore`]. Snapshots carry no version and are
//! never migrated. Loading a key that was never saved is a no-op (`Ok(None)`).

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::map::MapData;

/// Key the map snapshot is stored under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "ttrpgMapData";

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A string-to-string persistent store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value under `key`, or `None` if nothing was stored.
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), PersistError>;

    /// Delete `key`. Returns `true` if something was removed.
    async fn remove(&self, key: &str) -> Result<bool, PersistError>;
}

/// In-process store. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, PersistError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`. Characters other than ASCII alphanumerics become `_`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, PersistError> {
        if key.trim().is_empty() {
            return Err(PersistError::InvalidKey(key.to_string()));
        }
        let sanitized = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect::<String>();
        Ok(self.dir.join(format!("{sanitized}.json")))
    }
}

#[async_trait]
impl KeyValueStore for DirectoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).await?;
        fs::write(&path, value).await?;
        debug!(path = %path.display(), "Wrote snapshot file");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, PersistError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Serialize `map` and store it under `key`.
pub async fn save_map<S>(store: &S, key: &str, map: &MapData) -> Result<(), PersistError>
where
    S: KeyValueStore + ?Sized,
{
    let snapshot = map.to_json()?;
    store.set(key, snapshot).await?;
    info!(
        key,
        combatants = map.roster().len(),
        tokens = map.tokens().len(),
        "Map saved"
    );
    Ok(())
}

/// Load the snapshot under `key`. `Ok(None)` if nothing has been saved.
pub async fn load_map<S>(store: &S, key: &str) -> Result<Option<MapData>, PersistError>
where
    S: KeyValueStore + ?Sized,
{
    let Some(snapshot) = store.get(key).await? else {
        debug!(key, "No saved map");
        return Ok(None);
    };
    let map = MapData::from_json(&snapshot)?;
    info!(key, combatants = map.roster().len(), "Map loaded");
    Ok(Some(map))
}
