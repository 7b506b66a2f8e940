//! The inventory mutation service.
//!
//! `InventoryService` implements the mutation protocol (load, add,
//! increment, decrement, update, delete) on top of injected store adapters.
//! It owns no state of its own: the document store is the source of truth,
//! and callers are expected to re-`load()` after every successful mutation
//! rather than patch a local list.
//!
//! ## Concurrency
//!
//! Quantity adjustments go through [`DocumentStore::apply_delta`] and
//! renames through [`DocumentStore::replace`], both atomic inside the
//! adapter, so overlapping increments/decrements on one item cannot lose an
//! update and a rename cannot strand a half-moved document. Operations are
//! otherwise uncoordinated: overlapping add/update/delete calls on the same
//! key resolve as last-writer-wins.
//!
//! ## Blobs
//!
//! The blob path is stored in the document at write time. For documents
//! that predate stored paths, deletion falls back to deriving the path from
//! the URL; when that fails the blob is left behind and a warning is
//! logged. `delete` surfaces blob-store failures (the document stays put);
//! `decrement`-to-zero and `update` only clean up blobs best-effort, since
//! their document write has already committed.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use stockroom_core::{DomainError, ItemKey, Quantity};
use stockroom_inventory::{Item, ItemEdit, ItemRecord, NewItem};

use crate::blob_store::{BlobStore, image_blob_path, path_from_url};
use crate::document_store::{DeltaOutcome, DocumentStore};
use crate::error::StoreError;

/// Error produced by inventory operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Deterministic domain failure (validation, not-found, conflict).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A store adapter call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decremented {
    /// Quantity reduced by one; carries the remaining quantity.
    Remaining(Quantity),
    /// That was the last unit: the document is gone.
    Removed,
}

/// Inventory operations over a document store and a blob store.
///
/// Construct with explicit adapters (dependency injection); there is no
/// global store handle. Cheap to clone when the adapters are.
#[derive(Debug, Clone)]
pub struct InventoryService<D, B> {
    documents: D,
    blobs: B,
    blob_public_base: String,
}

impl<D, B> InventoryService<D, B>
where
    D: DocumentStore,
    B: BlobStore,
{
    /// `blob_public_base` is the URL prefix blobs are served under, used
    /// only to reverse-derive storage paths for legacy documents.
    pub fn new(documents: D, blobs: B, blob_public_base: impl Into<String>) -> Self {
        Self {
            documents,
            blobs,
            blob_public_base: blob_public_base.into(),
        }
    }

    /// Read the full inventory.
    ///
    /// Documents that do not parse as valid items (foreign writers, bad
    /// quantities) are skipped with a warning rather than failing the whole
    /// load. A store failure propagates; the caller's previous list simply
    /// stays stale.
    #[instrument(skip(self), err)]
    pub async fn load(&self) -> Result<Vec<Item>, ServiceError> {
        let documents = self.documents.list_all().await?;
        let mut items = Vec::with_capacity(documents.len());
        for (key, record) in documents {
            match Item::from_record(key, &record) {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!("skipping malformed inventory document: {e}"),
            }
        }
        Ok(items)
    }

    /// Create a new item.
    ///
    /// Adding a name that already exists (after normalization) is a
    /// conflict; growing an existing item's quantity is `increment`'s job.
    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn add(&self, new: NewItem) -> Result<Item, ServiceError> {
        if self.documents.get(&new.name).await?.is_some() {
            return Err(DomainError::conflict(format!("item '{}' already exists", new.name)).into());
        }

        let item = Item {
            name: new.name,
            quantity: new.quantity,
            image: new.image,
        };
        self.documents
            .set(&item.name, item.to_record(Utc::now()))
            .await?;
        Ok(item)
    }

    /// Increase an existing item's quantity by one.
    #[instrument(skip(self), err)]
    pub async fn increment(&self, raw_name: &str) -> Result<Quantity, ServiceError> {
        let key = ItemKey::new(raw_name)?;
        match self.documents.apply_delta(&key, 1).await? {
            DeltaOutcome::Updated(quantity) => Ok(quantity_from_stored(&key, quantity)?),
            DeltaOutcome::Missing => Err(DomainError::not_found().into()),
            DeltaOutcome::Removed(_) => {
                Err(DomainError::invariant("positive delta removed a document").into())
            }
        }
    }

    /// Decrease an existing item's quantity by one, deleting the document
    /// at the zero boundary (and then releasing its blob, best-effort).
    #[instrument(skip(self), err)]
    pub async fn decrement(&self, raw_name: &str) -> Result<Decremented, ServiceError> {
        let key = ItemKey::new(raw_name)?;
        match self.documents.apply_delta(&key, -1).await? {
            DeltaOutcome::Updated(quantity) => {
                Ok(Decremented::Remaining(quantity_from_stored(&key, quantity)?))
            }
            DeltaOutcome::Removed(last) => {
                self.release_blob(&key, &last).await;
                Ok(Decremented::Removed)
            }
            DeltaOutcome::Missing => Err(DomainError::not_found().into()),
        }
    }

    /// Rename / requantify / re-image an existing item.
    ///
    /// A fully unchanged edit is a no-op. Otherwise the document is rekeyed
    /// atomically; the old blob is released afterwards (best-effort) when
    /// the edit replaced or dropped the image.
    #[instrument(skip(self, edit), fields(new_name = %edit.name), err)]
    pub async fn update(&self, raw_name: &str, edit: ItemEdit) -> Result<Item, ServiceError> {
        let old_key = ItemKey::new(raw_name)?;
        let old_record = self
            .documents
            .get(&old_key)
            .await?
            .ok_or(DomainError::NotFound)?;
        let old_item = Item::from_record(old_key.clone(), &old_record)?;

        let new_item = Item {
            name: edit.name,
            quantity: edit.quantity,
            image: edit.image,
        };
        if new_item == old_item {
            return Ok(old_item);
        }

        self.documents
            .replace(&old_key, &new_item.name, new_item.to_record(Utc::now()))
            .await?;

        let old_url = old_item.image.as_ref().map(|i| i.url.as_str());
        let new_url = new_item.image.as_ref().map(|i| i.url.as_str());
        if old_url.is_some() && old_url != new_url {
            self.release_blob(&old_key, &old_record).await;
        }

        Ok(new_item)
    }

    /// Delete an item and its image.
    ///
    /// The blob goes first; a blob-store failure surfaces and leaves the
    /// document intact. An image whose storage path cannot be resolved is
    /// skipped with a warning (the document is still deleted).
    #[instrument(skip(self), err)]
    pub async fn delete(&self, raw_name: &str) -> Result<(), ServiceError> {
        let key = ItemKey::new(raw_name)?;
        let record = self
            .documents
            .get(&key)
            .await?
            .ok_or(DomainError::NotFound)?;

        match self.blob_path_of(&record) {
            Some(path) => self.blobs.delete(&path).await?,
            None if record.image_url.is_some() => {
                tracing::warn!(item = %key, "cannot resolve blob path from image url; blob left behind");
            }
            None => {}
        }

        self.documents.delete(&key).await?;
        Ok(())
    }

    /// Upload an image and return the reference to store with an item.
    #[instrument(skip(self, bytes), fields(size = bytes.len()), err)]
    pub async fn store_image(
        &self,
        original_filename: &str,
        bytes: Vec<u8>,
    ) -> Result<stockroom_inventory::ImageRef, ServiceError> {
        let path = image_blob_path(original_filename);
        let url = self.blobs.upload(&path, bytes).await?;
        Ok(stockroom_inventory::ImageRef::new(url, path))
    }

    /// Storage path for a record's image: the stored path, else derived
    /// from the URL (legacy documents).
    fn blob_path_of(&self, record: &ItemRecord) -> Option<String> {
        record.image_path.clone().or_else(|| {
            record
                .image_url
                .as_deref()
                .and_then(|url| path_from_url(url, &self.blob_public_base))
        })
    }

    /// Best-effort blob cleanup after a document write already committed.
    async fn release_blob(&self, key: &ItemKey, record: &ItemRecord) {
        match self.blob_path_of(record) {
            Some(path) => {
                if let Err(e) = self.blobs.delete(&path).await {
                    tracing::warn!(item = %key, %path, "blob cleanup failed: {e}");
                }
            }
            None if record.image_url.is_some() => {
                tracing::warn!(item = %key, "cannot resolve blob path from image url; blob left behind");
            }
            None => {}
        }
    }
}

fn quantity_from_stored(key: &ItemKey, raw: i64) -> Result<Quantity, DomainError> {
    u32::try_from(raw)
        .ok()
        .and_then(|q| Quantity::new(q).ok())
        .ok_or_else(|| DomainError::invariant(format!("store returned quantity {raw} for '{key}'")))
}
