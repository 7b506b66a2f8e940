use axum::{Router, routing::get};

pub mod images;
pub mod items;
pub mod system;

/// Router for all inventory endpoints.
pub fn router() -> Router {
    Router::new().nest(
        "/inventory",
        items::router()
            .merge(images::router())
            .route("/stream", get(system::stream)),
    )
}
