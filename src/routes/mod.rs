//! Router assembly.

pub mod api;
pub mod calls;
pub mod media;

use std::sync::Arc;

use axum::{Router, middleware};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::middleware::api_key_middleware;
use crate::state::AppState;

/// Full application router with state applied.
///
/// `POST /connect` sits behind the `x-api-key` guard; webhooks, probes and
/// the media stream are open.
pub fn create_app(state: Arc<AppState>) -> Router {
    let protected_routes = calls::create_call_control_router().layer(
        middleware::from_fn_with_state(state.clone(), api_key_middleware),
    );

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    api::create_api_router()
        .merge(calls::create_webhook_router())
        .merge(protected_routes)
        .merge(media::create_media_router())
        .with_state(state)
        .layer(security_headers)
}
