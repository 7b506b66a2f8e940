//! Document store adapter: one document per inventory item.
//!
//! The store is a key-value document API keyed by the normalized item name
//! ([`ItemKey`]); the key *is* the identity. Beyond plain get/set/delete,
//! the trait carries two compound operations so their read-check-write step
//! happens inside the adapter, atomically:
//!
//! - [`DocumentStore::apply_delta`] adjusts a quantity, deleting the
//!   document when it would reach zero. Replaces the separate
//!   read-then-write sequence that loses updates under concurrent clicks.
//! - [`DocumentStore::replace`] rekeys a document in one step. Replaces
//!   the delete-then-add rename whose failure window could drop the item.

use std::sync::Arc;

use async_trait::async_trait;

use stockroom_core::ItemKey;
use stockroom_inventory::ItemRecord;

use crate::error::StoreError;

mod in_memory;
mod postgres;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

/// Result of [`DocumentStore::apply_delta`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// No document at the key; nothing was written.
    Missing,
    /// The quantity was adjusted; carries the new value (always >= 1).
    Updated(i64),
    /// The delta took the quantity to zero or below: the document was
    /// deleted. Carries the record as it last existed, so the caller can
    /// release the associated blob.
    Removed(ItemRecord),
}

/// Key-value document store holding the `inventory` collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &ItemKey) -> Result<Option<ItemRecord>, StoreError>;

    /// Create-or-overwrite the document at `key`.
    async fn set(&self, key: &ItemKey, record: ItemRecord) -> Result<(), StoreError>;

    /// Delete the document at `key`. Deleting a missing key is Ok.
    async fn delete(&self, key: &ItemKey) -> Result<(), StoreError>;

    /// Enumerate every document. Order is the adapter's own; callers must
    /// not rely on it being stable across calls.
    async fn list_all(&self) -> Result<Vec<(ItemKey, ItemRecord)>, StoreError>;

    /// Atomically add `delta` to the quantity of an existing document.
    ///
    /// Implementations must not interleave the read and the write with other
    /// deltas on the same key: two concurrent `apply_delta(key, 1)` calls
    /// must land as +2. Fields other than `quantity` and `updatedAt` are
    /// preserved.
    async fn apply_delta(&self, key: &ItemKey, delta: i64) -> Result<DeltaOutcome, StoreError>;

    /// Atomically delete `old_key` and write `record` under `new_key`.
    ///
    /// With `old_key == new_key` this is a plain overwrite. An existing
    /// document at `new_key` is overwritten (same last-writer-wins
    /// semantics as [`DocumentStore::set`]).
    async fn replace(
        &self,
        old_key: &ItemKey,
        new_key: &ItemKey,
        record: ItemRecord,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get(&self, key: &ItemKey) -> Result<Option<ItemRecord>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &ItemKey, record: ItemRecord) -> Result<(), StoreError> {
        (**self).set(key, record).await
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), StoreError> {
        (**self).delete(key).await
    }

    async fn list_all(&self) -> Result<Vec<(ItemKey, ItemRecord)>, StoreError> {
        (**self).list_all().await
    }

    async fn apply_delta(&self, key: &ItemKey, delta: i64) -> Result<DeltaOutcome, StoreError> {
        (**self).apply_delta(key, delta).await
    }

    async fn replace(
        &self,
        old_key: &ItemKey,
        new_key: &ItemKey,
        record: ItemRecord,
    ) -> Result<(), StoreError> {
        (**self).replace(old_key, new_key, record).await
    }
}
