//! Persistent key-value store abstraction
//!
//! The cache and location registry both persist through this interface so the
//! rest of the crate is independent of the backing medium. Two backings are
//! provided: an in-memory map (tests, demos) and a file-per-key store in an
//! XDG-compliant cache directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use directories::ProjectDirs;
use thiserror::Error;

/// Errors that can occur when accessing the backing store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing medium failed
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The store location could not be determined
    #[error("could not determine store directory")]
    NoDirectory,
}

/// String-keyed persistent map used by the cache and the location registry.
///
/// All operations are async so callers are uniform regardless of whether the
/// backing medium is synchronous or not. The store has no TTL support;
/// freshness is decided entirely by the caller.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw value at `key`, or `None` if the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` under `key`, replacing any prior value as a whole
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key` if present; deleting an absent key is not an error
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// File-per-key store in an XDG-compliant cache directory
///
/// Each key is stored as `<key>.json` under the store directory
/// (`~/.cache/zipweather/` on Linux). Writes replace the whole file, so a
/// value is either the old content or the new content, never a partial patch.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where values are stored
    dir: PathBuf,
}

impl FileStore {
    /// Creates a FileStore using the XDG cache directory for this application
    ///
    /// Returns `Err(StoreError::NoDirectory)` if the platform cache directory
    /// cannot be determined (e.g., no home directory).
    pub fn new() -> Result<Self, StoreError> {
        let project_dirs = ProjectDirs::from("", "", "zipweather").ok_or(StoreError::NoDirectory)?;
        Ok(Self {
            dir: project_dirs.cache_dir().to_path_buf(),
        })
    }

    /// Creates a FileStore rooted at a custom directory
    ///
    /// Useful for testing or when a specific location is needed.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Returns the path of the file holding `key`
    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Ensures the store directory exists
    async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_dir().await?;
        tokio::fs::write(self.key_path(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
