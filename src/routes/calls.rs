use axum::{
    Router,
    routing::{any, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::calls;
use crate::state::AppState;
use std::sync::Arc;

/// Vonage webhooks. Vonage may call these with GET or POST.
pub fn create_webhook_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/event", any(calls::event))
        .route("/answer", any(calls::answer))
        .layer(TraceLayer::new_for_http())
}

/// Outbound call control.
///
/// Note: the API key middleware is applied in [`super::create_app`] once state
/// is available
pub fn create_call_control_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/connect", post(calls::connect))
        .layer(TraceLayer::new_for_http())
}
