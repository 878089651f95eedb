//! Durable user state.
//!
//! The session reads the whole [`User`] once, merges, and writes it back in
//! a single `save`. Stores never see a half-applied merge.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use todo_sync_types::User;
use tokio::sync::Mutex;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("{path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a valid user document.
    #[error("{path} is corrupt: {source}")]
    Corrupt {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The user could not be serialized.
    #[error("failed to serialize user: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Where the user's state lives.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the current state.
    async fn load(&self) -> Result<User, StoreError>;

    /// Replace the stored state.
    async fn save(&self, user: &User) -> Result<(), StoreError>;
}

/// In-memory store. Clones share the same user.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    user: Arc<Mutex<User>>,
}

impl MemoryStore {
    /// Create a store holding `user`.
    pub fn new(user: User) -> Self {
        Self {
            user: Arc::new(Mutex::new(user)),
        }
    }

    /// A copy of the stored user.
    pub async fn snapshot(&self) -> User {
        self.user.lock().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<User, StoreError> {
        Ok(self.snapshot().await)
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        *self.user.lock().await = user.clone();
        Ok(())
    }
}

/// A pretty-printed JSON file.
///
/// A missing file loads as an empty profile. Writes go to a sibling temp
/// file that is then renamed over the target.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists yet.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<User, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(User::default()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, user: &User) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
        }

        let content = serde_json::to_string_pretty(user).map_err(StoreError::Serialize)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use todo_sync_types::{Color, Task};

    fn user_with_task() -> User {
        let mut user = User::named("Ana");
        user.add_task(Task::new("Water plants", Color::default()))
            .unwrap();
        user
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryStore::default();
        let user = user_with_task();
        store.save(&user).await.unwrap();

        let handle = store.clone();
        assert_eq!(handle.load().await.unwrap(), user);
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("user.json"));
        assert!(!store.exists().await);

        let user = store.load().await.unwrap();
        assert!(user.tasks.is_empty());
        assert!(user.name.is_none());
    }

    #[tokio::test]
    async fn file_store_roundtrip_creates_parents() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/dir/user.json"));
        let user = user_with_task();

        store.save(&user).await.unwrap();
        assert!(store.exists().await);
        assert_eq!(store.load().await.unwrap(), user);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"createdAt\""));
        assert!(!dir.path().join("nested/dir/user.json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("user.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
