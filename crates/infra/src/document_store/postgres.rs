//! Postgres-backed document store.
//!
//! Persists the `inventory` collection as one row per item, keyed by the
//! normalized name. The compound operations (`apply_delta`, `replace`) run
//! inside a transaction with a `FOR UPDATE` row lock, so their
//! read-check-write step is atomic at the database level.
//!
//! ## Error Mapping
//!
//! | SQLx error | Postgres code | StoreError |
//! |------------|---------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any other | `Backend` |
//! | PoolClosed / Io / protocol | n/a | `Backend` |
//! | Row decode failure | n/a | `InvalidRecord` |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use stockroom_core::ItemKey;
use stockroom_inventory::ItemRecord;

use super::{DeltaOutcome, DocumentStore};
use crate::error::StoreError;

/// Postgres document store over a shared connection pool.
///
/// `Clone` + `Send + Sync`; the pool handles connection management.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

#[derive(Debug)]
struct ItemRow {
    quantity: i64,
    image_url: Option<String>,
    image_path: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            quantity: row.try_get("quantity")?,
            image_url: row.try_get("image_url")?,
            image_path: row.try_get("image_path")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ItemRow> for ItemRecord {
    fn from(row: ItemRow) -> Self {
        ItemRecord {
            quantity: row.quantity,
            image_url: row.image_url,
            image_path: row.image_path,
            updated_at: row.updated_at,
        }
    }
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the `inventory` table when it does not exist yet.
    ///
    /// Called once at wiring time; schema migration beyond this is out of
    /// scope.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inventory (
                key        TEXT PRIMARY KEY,
                quantity   BIGINT NOT NULL,
                image_url  TEXT,
                image_path TEXT,
                updated_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn upsert_in<'e, E>(executor: E, key: &ItemKey, record: &ItemRecord) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO inventory (key, quantity, image_url, image_path, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                image_url = EXCLUDED.image_url,
                image_path = EXCLUDED.image_path,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(record.quantity)
        .bind(record.image_url.as_deref())
        .bind(record.image_path.as_deref())
        .bind(record.updated_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self), fields(key = %key), err)]
    async fn get(&self, key: &ItemKey) -> Result<Option<ItemRecord>, StoreError> {
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT quantity, image_url, image_path, updated_at FROM inventory WHERE key = $1",
        )
        .bind(key.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        Ok(row.map(ItemRecord::from))
    }

    #[instrument(skip(self, record), fields(key = %key), err)]
    async fn set(&self, key: &ItemKey, record: ItemRecord) -> Result<(), StoreError> {
        Self::upsert_in(&*self.pool, key, &record)
            .await
            .map_err(|e| map_sqlx_error("set", e))
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn delete(&self, key: &ItemKey) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM inventory WHERE key = $1")
            .bind(key.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn list_all(&self) -> Result<Vec<(ItemKey, ItemRecord)>, StoreError> {
        let rows = sqlx::query_as::<_, KeyedItemRow>(
            "SELECT key, quantity, image_url, image_path, updated_at FROM inventory ORDER BY key",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_all", e))?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let key = ItemKey::from_stored(&row.key)
                .map_err(|e| StoreError::InvalidRecord(format!("bad stored key '{}': {e}", row.key)))?;
            documents.push((key, ItemRecord::from(row.item)));
        }
        Ok(documents)
    }

    #[instrument(skip(self), fields(key = %key), err)]
    async fn apply_delta(&self, key: &ItemKey, delta: i64) -> Result<DeltaOutcome, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("apply_delta.begin", e))?;

        // Row lock serializes concurrent deltas on the same key.
        let row = sqlx::query_as::<_, ItemRow>(
            "SELECT quantity, image_url, image_path, updated_at FROM inventory WHERE key = $1 FOR UPDATE",
        )
        .bind(key.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("apply_delta.select", e))?;

        let Some(row) = row else {
            return Ok(DeltaOutcome::Missing);
        };

        let new_quantity = row.quantity.saturating_add(delta);
        if new_quantity <= 0 {
            sqlx::query("DELETE FROM inventory WHERE key = $1")
                .bind(key.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("apply_delta.delete", e))?;
            tx.commit()
                .await
                .map_err(|e| map_sqlx_error("apply_delta.commit", e))?;
            return Ok(DeltaOutcome::Removed(ItemRecord::from(row)));
        }

        sqlx::query("UPDATE inventory SET quantity = $2, updated_at = $3 WHERE key = $1")
            .bind(key.as_str())
            .bind(new_quantity)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("apply_delta.update", e))?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("apply_delta.commit", e))?;

        Ok(DeltaOutcome::Updated(new_quantity))
    }

    #[instrument(skip(self, record), fields(old_key = %old_key, new_key = %new_key), err)]
    async fn replace(
        &self,
        old_key: &ItemKey,
        new_key: &ItemKey,
        record: ItemRecord,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("replace.begin", e))?;

        if old_key != new_key {
            sqlx::query("DELETE FROM inventory WHERE key = $1")
                .bind(old_key.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("replace.delete", e))?;
        }

        Self::upsert_in(&mut *tx, new_key, &record)
            .await
            .map_err(|e| map_sqlx_error("replace.upsert", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("replace.commit", e))?;
        Ok(())
    }
}

#[derive(Debug)]
struct KeyedItemRow {
    key: String,
    item: ItemRow,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for KeyedItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(KeyedItemRow {
            key: row.try_get("key")?,
            item: ItemRow::from_row(row)?,
        })
    }
}

fn map_sqlx_error(op: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return StoreError::Conflict(format!("{op}: {db}"));
        }
    }
    StoreError::Backend(format!("{op}: {e}"))
}
