use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio_stream::{StreamExt, wrappers::BroadcastStream};

use stockroom_infra::InventoryService;
use stockroom_infra::blob_store::{BlobStore, InMemoryBlobStore, LocalFsBlobStore};
use stockroom_infra::document_store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};

/// Realtime message broadcast via SSE after every successful mutation; the
/// client page treats it as "reload the list now".
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// The inventory service over type-erased adapters, so in-memory and
/// persistent wiring share one app shape.
pub type Inventory = InventoryService<Arc<dyn DocumentStore>, Arc<dyn BlobStore>>;

#[derive(Clone)]
pub struct AppServices {
    inventory: Inventory,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl AppServices {
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    /// Announce a committed mutation (lossy; no backpressure on handlers).
    pub fn notify_changed(&self, operation: &str, item: &str) {
        let _ = self.realtime_tx.send(RealtimeMessage {
            topic: "inventory.changed".to_string(),
            payload: serde_json::json!({
                "operation": operation,
                "item": item,
            }),
        });
    }
}

/// Wire stores from the environment: in-memory by default, Postgres +
/// local-filesystem blobs when `USE_PERSISTENT_STORES=true`.
pub async fn build_services() -> anyhow::Result<AppServices> {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        build_persistent_services().await
    } else {
        Ok(build_in_memory_services())
    }
}

/// In-memory wiring (dev/test): nothing survives a restart.
pub fn build_in_memory_services() -> AppServices {
    let documents: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::default());

    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    AppServices {
        inventory: InventoryService::new(documents, blobs, InMemoryBlobStore::DEFAULT_BASE_URL),
        realtime_tx,
    }
}

async fn build_persistent_services() -> anyhow::Result<AppServices> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set when USE_PERSISTENT_STORES=true"))?;
    let blob_root = std::env::var("BLOB_ROOT").unwrap_or_else(|_| "./blobs".to_string());
    let blob_public_base = std::env::var("BLOB_PUBLIC_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8080/blobs".to_string());

    let pool = PgPool::connect(&database_url).await?;
    let document_store = PostgresDocumentStore::new(pool);
    document_store.ensure_schema().await?;

    let documents: Arc<dyn DocumentStore> = Arc::new(document_store);
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalFsBlobStore::new(blob_root, blob_public_base.clone()));

    let (realtime_tx, _realtime_rx) = broadcast::channel::<RealtimeMessage>(256);

    Ok(AppServices {
        inventory: InventoryService::new(documents, blobs, blob_public_base),
        realtime_tx,
    })
}

/// Build the SSE change feed (used by `/inventory/stream`).
pub fn inventory_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(m) => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        // Lagged receivers just skip; the next reload catches them up.
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
