use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use stockroom_core::ItemKey;
use stockroom_inventory::ItemRecord;

use super::{DeltaOutcome, DocumentStore};
use crate::error::StoreError;

/// In-memory document store.
///
/// Intended for tests/dev. A `BTreeMap` keeps enumeration order stable
/// (sorted by key), which real document stores do not promise.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<ItemKey, ItemRecord>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StoreError {
        StoreError::Backend("lock poisoned".to_string())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<ItemRecord>, StoreError> {
        let documents = self.documents.read().map_err(|_| Self::poisoned())?;
        Ok(documents.get(key).cloned())
    }

    async fn set(&self, key: &ItemKey, record: ItemRecord) -> Result<(), StoreError> {
        let mut documents = self.documents.write().map_err(|_| Self::poisoned())?;
        documents.insert(key.clone(), record);
        Ok(())
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), StoreError> {
        let mut documents = self.documents.write().map_err(|_| Self::poisoned())?;
        documents.remove(key);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<(ItemKey, ItemRecord)>, StoreError> {
        let documents = self.documents.read().map_err(|_| Self::poisoned())?;
        Ok(documents
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    async fn apply_delta(&self, key: &ItemKey, delta: i64) -> Result<DeltaOutcome, StoreError> {
        // Single write-lock acquisition covers the read, the decision, and
        // the write: concurrent deltas on the same key serialize here.
        let mut documents = self.documents.write().map_err(|_| Self::poisoned())?;

        let Some(record) = documents.get_mut(key) else {
            return Ok(DeltaOutcome::Missing);
        };

        let new_quantity = record.quantity.saturating_add(delta);
        if new_quantity <= 0 {
            let last = documents
                .remove(key)
                .ok_or_else(|| StoreError::Backend("document vanished under lock".to_string()))?;
            return Ok(DeltaOutcome::Removed(last));
        }

        record.quantity = new_quantity;
        record.updated_at = Some(Utc::now());
        Ok(DeltaOutcome::Updated(new_quantity))
    }

    async fn replace(
        &self,
        old_key: &ItemKey,
        new_key: &ItemKey,
        record: ItemRecord,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().map_err(|_| Self::poisoned())?;
        if old_key != new_key {
            documents.remove(old_key);
        }
        documents.insert(new_key.clone(), record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> ItemKey {
        ItemKey::new(name).unwrap()
    }

    fn record(quantity: i64) -> ItemRecord {
        ItemRecord {
            quantity,
            image_url: None,
            image_path: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn set_get_delete_roundtrip() {
        let store = InMemoryDocumentStore::new();
        let apple = key("apple");

        assert_eq!(store.get(&apple).await.unwrap(), None);
        store.set(&apple, record(3)).await.unwrap();
        assert_eq!(store.get(&apple).await.unwrap().unwrap().quantity, 3);

        store.delete(&apple).await.unwrap();
        assert_eq!(store.get(&apple).await.unwrap(), None);
        // Idempotent delete.
        store.delete(&apple).await.unwrap();
    }

    #[tokio::test]
    async fn list_all_enumerates_sorted_by_key() {
        let store = InMemoryDocumentStore::new();
        store.set(&key("grape"), record(1)).await.unwrap();
        store.set(&key("apple"), record(2)).await.unwrap();

        let all = store.list_all().await.unwrap();
        let keys: Vec<&str> = all.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["apple", "grape"]);
    }

    #[tokio::test]
    async fn delta_on_missing_key_writes_nothing() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(
            store.apply_delta(&key("ghost"), 1).await.unwrap(),
            DeltaOutcome::Missing
        );
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delta_to_zero_removes_and_returns_last_record() {
        let store = InMemoryDocumentStore::new();
        let apple = key("apple");
        let mut rec = record(1);
        rec.image_url = Some("https://blobs.test/o/images%2Fapple1".to_string());
        rec.image_path = Some("images/apple1".to_string());
        store.set(&apple, rec).await.unwrap();

        match store.apply_delta(&apple, -1).await.unwrap() {
            DeltaOutcome::Removed(last) => {
                assert_eq!(last.image_path.as_deref(), Some("images/apple1"));
            }
            other => panic!("expected Removed, got {other:?}"),
        }
        assert_eq!(store.get(&apple).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delta_preserves_image_fields() {
        let store = InMemoryDocumentStore::new();
        let apple = key("apple");
        let mut rec = record(2);
        rec.image_url = Some("https://blobs.test/o/images%2Fapple1".to_string());
        store.set(&apple, rec).await.unwrap();

        assert_eq!(store.apply_delta(&apple, 1).await.unwrap(), DeltaOutcome::Updated(3));
        let stored = store.get(&apple).await.unwrap().unwrap();
        assert_eq!(stored.image_url.as_deref(), Some("https://blobs.test/o/images%2Fapple1"));
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn replace_rekeys_in_one_step() {
        let store = InMemoryDocumentStore::new();
        store.set(&key("aple"), record(4)).await.unwrap();

        store.replace(&key("aple"), &key("apple"), record(4)).await.unwrap();
        assert_eq!(store.get(&key("aple")).await.unwrap(), None);
        assert_eq!(store.get(&key("apple")).await.unwrap().unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn replace_onto_same_key_is_an_overwrite() {
        let store = InMemoryDocumentStore::new();
        let apple = key("apple");
        store.set(&apple, record(4)).await.unwrap();

        store.replace(&apple, &apple, record(9)).await.unwrap();
        assert_eq!(store.get(&apple).await.unwrap().unwrap().quantity, 9);
    }
}
