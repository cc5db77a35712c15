use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Service banner and probes.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::root))
        .route("/_/health", get(api::health_check))
        .route("/_/metrics", get(api::health_check))
        .layer(TraceLayer::new_for_http())
}
