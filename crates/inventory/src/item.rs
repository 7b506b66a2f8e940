use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainResult, ItemKey, Quantity};

/// Reference to an item image in the blob store.
///
/// `path` is the blob's storage path, recorded at write time so deletion
/// never has to parse it back out of the URL. It is optional on read:
/// documents written before the path was stored carry only the URL, and for
/// those the path is reverse-derived as a fallback (see
/// `stockroom_infra::blob_store::path_from_url`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub path: Option<String>,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: Some(path.into()),
        }
    }

    /// An image reference recovered from a document that predates stored paths.
    pub fn url_only(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: None,
        }
    }
}

/// The stored document fields, one document per item, keyed by [`ItemKey`].
///
/// Field names match the wire schema of the `inventory` collection:
/// `quantity` and `imageUrl` are the original fields, `imagePath` and
/// `updatedAt` are written by this system. Quantity is kept as a raw `i64`
/// here; validation into [`Quantity`] happens when a record becomes an
/// [`Item`], so a foreign document with a bad quantity fails loudly at the
/// boundary instead of poisoning deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ItemRecord {
    pub fn new(quantity: Quantity, image: Option<&ImageRef>, updated_at: DateTime<Utc>) -> Self {
        Self {
            quantity: i64::from(quantity.get()),
            image_url: image.map(|i| i.url.clone()),
            image_path: image.and_then(|i| i.path.clone()),
            updated_at: Some(updated_at),
        }
    }

    pub fn image(&self) -> Option<ImageRef> {
        self.image_url.as_ref().map(|url| ImageRef {
            url: url.clone(),
            path: self.image_path.clone(),
        })
    }
}

/// A loaded inventory item (the view the client renders).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: ItemKey,
    pub quantity: Quantity,
    pub image: Option<ImageRef>,
}

impl Item {
    /// Build an item from a stored document.
    ///
    /// Fails with a validation error when the record's quantity is not a
    /// positive integer that fits the quantity domain.
    pub fn from_record(name: ItemKey, record: &ItemRecord) -> DomainResult<Self> {
        let quantity = u32::try_from(record.quantity)
            .ok()
            .and_then(|q| Quantity::new(q).ok())
            .ok_or_else(|| {
                stockroom_core::DomainError::validation(format!(
                    "document '{name}' has invalid quantity {}",
                    record.quantity
                ))
            })?;

        Ok(Self {
            name,
            quantity,
            image: record.image(),
        })
    }

    pub fn to_record(&self, updated_at: DateTime<Utc>) -> ItemRecord {
        ItemRecord::new(self.quantity, self.image.as_ref(), updated_at)
    }
}

/// Validated input for the `add` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: ItemKey,
    pub quantity: Quantity,
    pub image: Option<ImageRef>,
}

impl NewItem {
    pub fn new(raw_name: &str, quantity: u32, image: Option<ImageRef>) -> DomainResult<Self> {
        Ok(Self {
            name: ItemKey::new(raw_name)?,
            quantity: Quantity::new(quantity)?,
            image,
        })
    }
}

/// Validated input for the `update` operation (rename / requantify / re-image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEdit {
    pub name: ItemKey,
    pub quantity: Quantity,
    pub image: Option<ImageRef>,
}

impl ItemEdit {
    pub fn new(raw_name: &str, quantity: u32, image: Option<ImageRef>) -> DomainResult<Self> {
        Ok(Self {
            name: ItemKey::new(raw_name)?,
            quantity: Quantity::new(quantity)?,
            image,
        })
    }
}
