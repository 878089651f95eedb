//! Binary blob storage, used for the locally stored profile picture.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use todo_sync_core::BlobOp;
use tokio::sync::Mutex;

use crate::store::StoreError;

/// Key-value blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a blob. `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Write a blob, replacing any previous value.
    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Remove a blob. Absent keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Run a planned list of blob operations in order.
pub async fn apply_blob_ops<B>(blobs: &B, ops: &[BlobOp]) -> Result<(), StoreError>
where
    B: BlobStore + ?Sized,
{
    for op in ops {
        match op {
            BlobOp::Put { key, data } => blobs.put(key, data).await?,
            BlobOp::Delete { key } => blobs.delete(key).await?,
        }
    }
    Ok(())
}

/// In-memory blob store. Clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.blobs.lock().await.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.lock().await.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Store blobs under `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers; keep them from escaping the directory.
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(name)
    }
}

fn io_error(path: PathBuf, source: std::io::Error) -> StoreError {
    StoreError::Io { path, source }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(self.dir.clone(), e))?;
        let path = self.path_for(key);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use todo_sync_types::PROFILE_PICTURE_KEY;

    #[tokio::test]
    async fn memory_blob_store_basics() {
        let blobs = MemoryBlobStore::new();
        assert_eq!(blobs.get("k").await.unwrap(), None);
        blobs.put("k", b"v").await.unwrap();
        assert_eq!(blobs.get("k").await.unwrap(), Some(b"v".to_vec()));
        blobs.delete("k").await.unwrap();
        blobs.delete("k").await.unwrap();
        assert_eq!(blobs.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn file_blob_store_basics() {
        let dir = TempDir::new().unwrap();
        let blobs = FileBlobStore::new(dir.path().join("blobs"));

        assert_eq!(blobs.get(PROFILE_PICTURE_KEY).await.unwrap(), None);
        blobs.put(PROFILE_PICTURE_KEY, b"\x89PNG").await.unwrap();
        assert!(dir.path().join("blobs").join(PROFILE_PICTURE_KEY).exists());
        assert_eq!(
            blobs.get(PROFILE_PICTURE_KEY).await.unwrap(),
            Some(b"\x89PNG".to_vec())
        );
        blobs.delete(PROFILE_PICTURE_KEY).await.unwrap();
        blobs.delete(PROFILE_PICTURE_KEY).await.unwrap();
        assert_eq!(blobs.get(PROFILE_PICTURE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_cannot_escape_directory() {
        let dir = TempDir::new().unwrap();
        let blobs = FileBlobStore::new(dir.path().join("blobs"));
        blobs.put("../outside", b"x").await.unwrap();
        assert!(!dir.path().join("outside").exists());
    }

    #[tokio::test]
    async fn ops_run_in_order() {
        let blobs = MemoryBlobStore::new();
        let ops = vec![
            BlobOp::Put {
                key: PROFILE_PICTURE_KEY,
                data: b"one".to_vec(),
            },
            BlobOp::Delete {
                key: PROFILE_PICTURE_KEY,
            },
        ];
        apply_blob_ops(&blobs, &ops).await.unwrap();
        assert_eq!(blobs.get(PROFILE_PICTURE_KEY).await.unwrap(), None);
    }
}
