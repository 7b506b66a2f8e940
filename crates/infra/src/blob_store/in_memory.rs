use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{BlobStore, url_for_path};
use crate::error::StoreError;

/// In-memory blob store for tests/dev.
///
/// URLs are shaped like a real object store's (`{base}/{encoded path}?alt=media`)
/// so the URL/path round-trip gets exercised the same way as in production.
#[derive(Debug)]
pub struct InMemoryBlobStore {
    base_url: String,
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub const DEFAULT_BASE_URL: &'static str = "https://blobs.stockroom.test/v0/o";

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Number of stored blobs (test helper).
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        let mut blobs = self.blobs.write().map_err(|_| Self::poisoned())?;
        blobs.insert(path.to_string(), bytes);
        Ok(url_for_path(&self.base_url, path))
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().map_err(|_| Self::poisoned())?;
        blobs.remove(path);
        Ok(())
    }

    async fn download_url(&self, path: &str) -> Result<String, StoreError> {
        let blobs = self.blobs.read().map_err(|_| Self::poisoned())?;
        if !blobs.contains_key(path) {
            return Err(StoreError::NotFound(format!("no blob at '{path}'")));
        }
        Ok(url_for_path(&self.base_url, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::path_from_url;

    #[tokio::test]
    async fn upload_then_download_url_agree() {
        let store = InMemoryBlobStore::default();
        let url = store.upload("images/a1", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.download_url("images/a1").await.unwrap(), url);
        assert_eq!(path_from_url(&url, store.base_url()).as_deref(), Some("images/a1"));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryBlobStore::default();
        store.upload("images/a1", vec![0]).await.unwrap();
        store.delete("images/a1").await.unwrap();
        store.delete("images/a1").await.unwrap();
        assert!(matches!(
            store.download_url("images/a1").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
