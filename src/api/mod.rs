pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::AppState;

/// Action API router
///
/// Reads are GET with query parameters, writes are POST with a JSON body,
/// both under `/api/3/action/<name>`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/3/action/resource_show", get(handlers::resource_show))
        .route("/api/3/action/package_show", get(handlers::package_show))
        .route(
            "/api/3/action/resource_autocomplete",
            get(handlers::resource_autocomplete),
        )
        .route("/api/3/action/resource_create", post(handlers::resource_create))
        .route("/api/3/action/resource_update", post(handlers::resource_update))
        .route("/api/3/action/package_create", post(handlers::package_create))
        .route("/api/3/action/package_update", post(handlers::package_update))
        .route("/api/3/action/resource_fork", post(handlers::resource_fork))
        .route("/api/3/action/dataset_fork", post(handlers::dataset_fork))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
