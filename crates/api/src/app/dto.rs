use serde::Deserialize;

use stockroom_inventory::{ImageRef, Item};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

/// Optional image reference from request fields. A path without a URL is
/// meaningless and ignored.
pub fn image_ref_from(image_url: Option<String>, image_path: Option<String>) -> Option<ImageRef> {
    image_url.map(|url| ImageRef {
        url,
        path: image_path,
    })
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn item_to_json(item: &Item) -> serde_json::Value {
    serde_json::json!({
        "name": item.name.as_str(),
        "quantity": item.quantity.get(),
        "imageUrl": item.image.as_ref().map(|i| i.url.as_str()),
        "imagePath": item.image.as_ref().and_then(|i| i.path.as_deref()),
    })
}
