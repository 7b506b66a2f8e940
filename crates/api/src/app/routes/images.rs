use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Multipart},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/images", post(upload_image))
}

/// Accept a multipart upload (`file` part) and store it in the blob store.
///
/// Responds with the storage path and URL; the client sends both back when
/// it creates or updates the item, so the path never has to be derived from
/// the URL later.
pub async fn upload_image(
    Extension(services): Extension<Arc<AppServices>>,
    mut multipart: Multipart,
) -> axum::response::Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("malformed multipart body: {e}"),
                );
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("image").to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("failed to read upload: {e}"),
                );
            }
        };
        if bytes.is_empty() {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "uploaded file is empty",
            );
        }

        return match services.inventory().store_image(&filename, bytes.to_vec()).await {
            Ok(image) => (
                StatusCode::CREATED,
                Json(serde_json::json!({
                    "path": image.path,
                    "url": image.url,
                })),
            )
                .into_response(),
            Err(e) => errors::service_error_to_response(e),
        };
    }

    errors::json_error(
        StatusCode::BAD_REQUEST,
        "validation_error",
        "multipart body must contain a 'file' part",
    )
}
