use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use stockroom_core::ItemKey;
use stockroom_inventory::{ItemEdit, NewItem, filter};
use stockroom_infra::Decremented;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(add_item))
        .route("/items/:name", put(update_item).delete(delete_item))
        .route("/items/:name/increment", post(increment_item))
        .route("/items/:name/decrement", post(decrement_item))
}

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::SearchParams>,
) -> axum::response::Response {
    let items = match services.inventory().load().await {
        Ok(items) => items,
        Err(e) => return errors::service_error_to_response(e),
    };

    let query = params.q.unwrap_or_default();
    let filtered = filter(&items, &query);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "items": filtered.iter().map(|i| dto::item_to_json(i)).collect::<Vec<_>>(),
        })),
    )
        .into_response()
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::AddItemRequest>,
) -> axum::response::Response {
    let image = dto::image_ref_from(body.image_url, body.image_path);
    let new = match NewItem::new(&body.name, body.quantity, image) {
        Ok(n) => n,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.inventory().add(new).await {
        Ok(item) => {
            services.notify_changed("add", item.name.as_str());
            (StatusCode::CREATED, Json(dto::item_to_json(&item))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn increment_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> axum::response::Response {
    let key = match ItemKey::new(&name) {
        Ok(k) => k,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.inventory().increment(key.as_str()).await {
        Ok(quantity) => {
            services.notify_changed("increment", key.as_str());
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "name": key.as_str(),
                    "quantity": quantity.get(),
                })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn decrement_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> axum::response::Response {
    let key = match ItemKey::new(&name) {
        Ok(k) => k,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.inventory().decrement(key.as_str()).await {
        Ok(outcome) => {
            services.notify_changed("decrement", key.as_str());
            let (quantity, removed) = match outcome {
                Decremented::Remaining(q) => (q.get(), false),
                Decremented::Removed => (0, true),
            };
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "name": key.as_str(),
                    "quantity": quantity,
                    "removed": removed,
                })),
            )
                .into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
    Json(body): Json<dto::UpdateItemRequest>,
) -> axum::response::Response {
    let image = dto::image_ref_from(body.image_url, body.image_path);
    let edit = match ItemEdit::new(&body.name, body.quantity, image) {
        Ok(e) => e,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.inventory().update(&name, edit).await {
        Ok(item) => {
            services.notify_changed("update", item.name.as_str());
            (StatusCode::OK, Json(dto::item_to_json(&item))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(name): Path<String>,
) -> axum::response::Response {
    let key = match ItemKey::new(&name) {
        Ok(k) => k,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.inventory().delete(key.as_str()).await {
        Ok(()) => {
            services.notify_changed("delete", key.as_str());
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}
