use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use super::{BlobStore, url_for_path};
use crate::error::StoreError;

/// Filesystem-backed blob store.
///
/// Blobs live under `root` at their storage path; URLs are built from
/// `public_base` (wherever that directory is served from). Used in
/// persistent mode alongside the Postgres document store.
#[derive(Debug, Clone)]
pub struct LocalFsBlobStore {
    root: PathBuf,
    public_base: String,
}

impl LocalFsBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    pub fn public_base(&self) -> &str {
        &self.public_base
    }

    /// Resolve a storage path under the root, rejecting traversal segments.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes {
            return Err(StoreError::InvalidRecord(format!(
                "blob path '{path}' escapes the storage root"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalFsBlobStore {
    #[instrument(skip(self, bytes), fields(size = bytes.len()), err)]
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, bytes).await?;
        Ok(url_for_path(&self.public_base, path))
    }

    #[instrument(skip(self), err)]
    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let file = self.resolve(path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), err)]
    async fn download_url(&self, path: &str) -> Result<String, StoreError> {
        let file = self.resolve(path)?;
        match tokio::fs::try_exists(&file).await {
            Ok(true) => Ok(url_for_path(&self.public_base, path)),
            Ok(false) => Err(StoreError::NotFound(format!("no blob at '{path}'"))),
            Err(e) => Err(e.into()),
        }
    }
}
