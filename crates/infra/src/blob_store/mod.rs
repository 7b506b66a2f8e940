//! Blob store adapter: item images, addressed by storage path.
//!
//! Uploads return a retrievable URL. Documents written by this system store
//! the path next to the URL, so deletion normally never parses a URL; the
//! [`path_from_url`] fallback exists only for documents that predate stored
//! paths.

use std::sync::Arc;

use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use uuid::Uuid;

use crate::error::StoreError;

mod in_memory;
mod local_fs;

pub use in_memory::InMemoryBlobStore;
pub use local_fs::LocalFsBlobStore;

/// Content store for item images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path` (overwriting) and return the blob's URL.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError>;

    /// Delete the blob at `path`. Deleting a missing path is Ok.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// URL for an existing blob. `NotFound` when nothing is stored at `path`.
    async fn download_url(&self, path: &str) -> Result<String, StoreError>;
}

#[async_trait]
impl<S> BlobStore for Arc<S>
where
    S: BlobStore + ?Sized,
{
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, StoreError> {
        (**self).upload(path, bytes).await
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        (**self).delete(path).await
    }

    async fn download_url(&self, path: &str) -> Result<String, StoreError> {
        (**self).download_url(path).await
    }
}

/// Storage path for a newly uploaded item image.
///
/// Convention: `images/{originalFilename}{randomUUID}`. The uuid suffix
/// keeps repeated uploads of the same filename from colliding.
pub fn image_blob_path(original_filename: &str) -> String {
    format!("images/{original_filename}{}", Uuid::now_v7())
}

/// Public URL for a blob path: the percent-encoded path under `base`.
///
/// `/` is encoded too (object stores treat the whole path as a single URL
/// segment), and `?alt=media` marks a direct-content link.
pub fn url_for_path(base: &str, path: &str) -> String {
    let encoded = utf8_percent_encode(path, NON_ALPHANUMERIC);
    format!("{}/{encoded}?alt=media", base.trim_end_matches('/'))
}

/// Reverse-derive a storage path from a blob URL.
///
/// Inverse of [`url_for_path`]: strip the base prefix, cut any query
/// string, percent-decode. Returns `None` when the URL does not start with
/// `base` or the remainder does not decode to a non-empty path; callers
/// must treat that as "path unknown", not as an error to surface.
pub fn path_from_url(url: &str, base: &str) -> Option<String> {
    let rest = url.strip_prefix(base.trim_end_matches('/'))?;
    let rest = rest.strip_prefix('/')?;
    let rest = rest.split('?').next().unwrap_or(rest);

    let decoded = percent_decode_str(rest).decode_utf8().ok()?;
    if decoded.is_empty() {
        return None;
    }
    Some(decoded.into_owned())
}
