//! Service-level tests over the in-memory adapters.

use std::sync::Arc;

use stockroom_core::{DomainError, Quantity};
use stockroom_inventory::{ItemEdit, ItemRecord, NewItem};

use crate::blob_store::{BlobStore, InMemoryBlobStore, url_for_path};
use crate::document_store::{DocumentStore, InMemoryDocumentStore};
use crate::error::StoreError;
use crate::service::{Decremented, InventoryService, ServiceError};

type TestService = InventoryService<Arc<InMemoryDocumentStore>, Arc<InMemoryBlobStore>>;

fn service() -> (TestService, Arc<InMemoryDocumentStore>, Arc<InMemoryBlobStore>) {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let blobs = Arc::new(InMemoryBlobStore::default());
    let svc = InventoryService::new(
        documents.clone(),
        blobs.clone(),
        InMemoryBlobStore::DEFAULT_BASE_URL,
    );
    (svc, documents, blobs)
}

fn key(name: &str) -> stockroom_core::ItemKey {
    stockroom_core::ItemKey::new(name).unwrap()
}

#[tokio::test]
async fn add_then_load_yields_exactly_that_item() {
    let (svc, _, _) = service();

    svc.add(NewItem::new("banana", 3, None).unwrap()).await.unwrap();

    let items = svc.load().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name.as_str(), "banana");
    assert_eq!(items[0].quantity.get(), 3);
}

#[tokio::test]
async fn add_normalizes_before_hitting_the_store() {
    let (svc, documents, _) = service();

    svc.add(NewItem::new("  Banana ", 2, None).unwrap()).await.unwrap();
    assert_eq!(documents.get(&key("banana")).await.unwrap().unwrap().quantity, 2);
}

#[tokio::test]
async fn add_on_existing_name_is_a_conflict_and_changes_nothing() {
    let (svc, documents, _) = service();

    svc.add(NewItem::new("apple", 5, None).unwrap()).await.unwrap();
    // Same identity despite case/whitespace differences.
    let err = svc.add(NewItem::new(" APPLE ", 1, None).unwrap()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

    assert_eq!(documents.get(&key("apple")).await.unwrap().unwrap().quantity, 5);
}

#[tokio::test]
async fn increment_then_decrement_restores_prior_quantity() {
    let (svc, _, _) = service();

    svc.add(NewItem::new("apple", 4, None).unwrap()).await.unwrap();
    assert_eq!(svc.increment("apple").await.unwrap().get(), 5);
    assert_eq!(
        svc.decrement("apple").await.unwrap(),
        Decremented::Remaining(Quantity::new(4).unwrap())
    );
}

#[tokio::test]
async fn decrement_at_one_removes_the_document() {
    let (svc, _, _) = service();

    svc.add(NewItem::new("apple", 1, None).unwrap()).await.unwrap();
    assert_eq!(svc.decrement("apple").await.unwrap(), Decremented::Removed);

    let items = svc.load().await.unwrap();
    assert!(items.iter().all(|i| i.name.as_str() != "apple"));

    // The document really is gone, not stored at zero.
    assert!(matches!(
        svc.decrement("apple").await.unwrap_err(),
        ServiceError::Domain(DomainError::NotFound)
    ));
}

#[tokio::test]
async fn increment_on_missing_item_is_not_found() {
    let (svc, _, _) = service();
    assert!(matches!(
        svc.increment("ghost").await.unwrap_err(),
        ServiceError::Domain(DomainError::NotFound)
    ));
}

#[tokio::test]
async fn empty_name_is_rejected_before_any_store_call() {
    let (svc, _, _) = service();
    for raw in ["", "   ", "\t"] {
        assert!(matches!(
            svc.increment(raw).await.unwrap_err(),
            ServiceError::Domain(DomainError::Validation(_))
        ));
    }
}

#[tokio::test]
async fn delete_removes_document_and_blob() {
    let (svc, _, blobs) = service();

    let image = svc.store_image("apple.png", vec![1, 2, 3]).await.unwrap();
    assert_eq!(blobs.len(), 1);

    svc.add(NewItem::new("apple", 2, Some(image)).unwrap()).await.unwrap();
    svc.delete("apple").await.unwrap();

    assert!(svc.load().await.unwrap().is_empty());
    assert!(blobs.is_empty());
}

#[tokio::test]
async fn delete_cleans_up_legacy_records_via_url_derivation() {
    let (svc, documents, blobs) = service();

    // A document written before storage paths were recorded: imageUrl only.
    let url = blobs.upload("images/apple.png123", vec![7]).await.unwrap();
    documents
        .set(
            &key("apple"),
            ItemRecord {
                quantity: 1,
                image_url: Some(url),
                image_path: None,
                updated_at: None,
            },
        )
        .await
        .unwrap();

    svc.delete("apple").await.unwrap();
    assert!(blobs.is_empty());
}

#[tokio::test]
async fn delete_with_unresolvable_image_url_still_deletes_the_document() {
    let (svc, documents, blobs) = service();

    blobs.upload("images/orphan", vec![7]).await.unwrap();
    documents
        .set(
            &key("apple"),
            ItemRecord {
                quantity: 1,
                image_url: Some(url_for_path("https://elsewhere.example/o", "images/orphan")),
                image_path: None,
                updated_at: None,
            },
        )
        .await
        .unwrap();

    svc.delete("apple").await.unwrap();
    assert!(svc.load().await.unwrap().is_empty());
    // The foreign-prefixed URL could not be mapped back; the blob survives.
    assert_eq!(blobs.len(), 1);
}

#[tokio::test]
async fn decrement_to_zero_releases_the_blob() {
    let (svc, _, blobs) = service();

    let image = svc.store_image("pear.png", vec![4]).await.unwrap();
    svc.add(NewItem::new("pear", 1, Some(image)).unwrap()).await.unwrap();

    assert_eq!(svc.decrement("pear").await.unwrap(), Decremented::Removed);
    assert!(blobs.is_empty());
}

#[tokio::test]
async fn update_renames_atomically_and_keeps_an_unchanged_image() {
    let (svc, documents, blobs) = service();

    let image = svc.store_image("apple.png", vec![1]).await.unwrap();
    svc.add(NewItem::new("aple", 4, Some(image.clone())).unwrap()).await.unwrap();

    let updated = svc
        .update("aple", ItemEdit::new("apple", 4, Some(image)).unwrap())
        .await
        .unwrap();
    assert_eq!(updated.name.as_str(), "apple");

    assert_eq!(documents.get(&key("aple")).await.unwrap(), None);
    assert_eq!(documents.get(&key("apple")).await.unwrap().unwrap().quantity, 4);
    // Same image travelled with the rename; its blob must survive.
    assert_eq!(blobs.len(), 1);
}

#[tokio::test]
async fn update_replacing_the_image_releases_the_old_blob() {
    let (svc, _, blobs) = service();

    let first = svc.store_image("old.png", vec![1]).await.unwrap();
    let first_path = first.path.clone().unwrap();
    svc.add(NewItem::new("apple", 2, Some(first)).unwrap()).await.unwrap();

    let second = svc.store_image("new.png", vec![2]).await.unwrap();
    svc.update("apple", ItemEdit::new("apple", 2, Some(second.clone())).unwrap())
        .await
        .unwrap();

    assert_eq!(blobs.len(), 1);
    assert!(matches!(
        blobs.download_url(&first_path).await,
        Err(StoreError::NotFound(_))
    ));

    let items = svc.load().await.unwrap();
    assert_eq!(items[0].image.as_ref().unwrap().url, second.url);
}

#[tokio::test]
async fn update_renaming_onto_an_occupied_key_overwrites() {
    let (svc, documents, _) = service();

    svc.add(NewItem::new("apple", 2, None).unwrap()).await.unwrap();
    svc.add(NewItem::new("banana", 7, None).unwrap()).await.unwrap();

    // Last writer wins, matching `set` semantics.
    svc.update("apple", ItemEdit::new("banana", 2, None).unwrap())
        .await
        .unwrap();

    assert_eq!(documents.get(&key("apple")).await.unwrap(), None);
    assert_eq!(documents.get(&key("banana")).await.unwrap().unwrap().quantity, 2);
}

#[tokio::test]
async fn update_with_no_changes_is_a_no_op() {
    let (svc, documents, _) = service();

    svc.add(NewItem::new("apple", 2, None).unwrap()).await.unwrap();
    let before = documents.get(&key("apple")).await.unwrap();

    let item = svc
        .update("apple", ItemEdit::new("apple", 2, None).unwrap())
        .await
        .unwrap();
    assert_eq!(item.quantity.get(), 2);

    // Nothing was rewritten (updatedAt untouched).
    assert_eq!(documents.get(&key("apple")).await.unwrap(), before);
}

#[tokio::test]
async fn update_on_missing_item_is_not_found() {
    let (svc, _, _) = service();
    assert!(matches!(
        svc.update("ghost", ItemEdit::new("ghost", 1, None).unwrap())
            .await
            .unwrap_err(),
        ServiceError::Domain(DomainError::NotFound)
    ));
}

#[tokio::test]
async fn concurrent_increments_all_land() {
    let (svc, _, _) = service();
    svc.add(NewItem::new("apple", 1, None).unwrap()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let svc = svc.clone();
        handles.push(tokio::spawn(async move { svc.increment("apple").await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let items = svc.load().await.unwrap();
    assert_eq!(items[0].quantity.get(), 21);
}

/// Cross-operation interleavings stay last-writer-wins: a delete racing an
/// increment can resolve either way, but never to a corrupt state.
#[tokio::test]
async fn delete_racing_increment_resolves_to_a_consistent_state() {
    let (svc, _, _) = service();
    svc.add(NewItem::new("apple", 5, None).unwrap()).await.unwrap();

    let inc = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.increment("apple").await })
    };
    let del = {
        let svc = svc.clone();
        tokio::spawn(async move { svc.delete("apple").await })
    };
    let _ = inc.await.unwrap();
    let _ = del.await.unwrap();

    // Whichever write landed last, the store holds either nothing or a
    // well-formed item.
    let items = svc.load().await.unwrap();
    assert!(items.len() <= 1);
    if let Some(item) = items.first() {
        assert!(item.quantity.get() >= 1);
    }
}

/// A blob store that refuses every call; used to pin down failure ordering.
#[derive(Debug, Default)]
struct FailingBlobStore;

#[async_trait::async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload(&self, _path: &str, _bytes: Vec<u8>) -> Result<String, StoreError> {
        Err(StoreError::Backend("blob store down".to_string()))
    }

    async fn delete(&self, _path: &str) -> Result<(), StoreError> {
        Err(StoreError::Backend("blob store down".to_string()))
    }

    async fn download_url(&self, _path: &str) -> Result<String, StoreError> {
        Err(StoreError::Backend("blob store down".to_string()))
    }
}

#[tokio::test]
async fn blob_failure_during_delete_leaves_the_document_intact() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let svc = InventoryService::new(
        documents.clone(),
        FailingBlobStore,
        InMemoryBlobStore::DEFAULT_BASE_URL,
    );

    documents
        .set(
            &key("apple"),
            ItemRecord {
                quantity: 1,
                image_url: Some(url_for_path(InMemoryBlobStore::DEFAULT_BASE_URL, "images/a")),
                image_path: Some("images/a".to_string()),
                updated_at: None,
            },
        )
        .await
        .unwrap();

    let err = svc.delete("apple").await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::Backend(_))));
    assert!(documents.get(&key("apple")).await.unwrap().is_some());
}

#[tokio::test]
async fn blob_failure_during_decrement_does_not_fail_the_decrement() {
    let documents = Arc::new(InMemoryDocumentStore::new());
    let svc = InventoryService::new(
        documents.clone(),
        FailingBlobStore,
        InMemoryBlobStore::DEFAULT_BASE_URL,
    );

    documents
        .set(
            &key("apple"),
            ItemRecord {
                quantity: 1,
                image_url: None,
                image_path: Some("images/a".to_string()),
                updated_at: None,
            },
        )
        .await
        .unwrap();

    // The document delete already committed inside the store; blob cleanup
    // is best-effort.
    assert_eq!(svc.decrement("apple").await.unwrap(), Decremented::Removed);
    assert_eq!(documents.get(&key("apple")).await.unwrap(), None);
}
