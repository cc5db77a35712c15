//! Media stream WebSocket route.
//!
//! `GET /media-stream` upgrades to the socket Vonage opens after the
//! `/answer` NCCO's `connect` action.
//!
//! # Protocol
//!
//! Caller → server:
//! - Binary frames: PCM16 little-endian, 16 kHz, mono
//! - Text frames: lifecycle notices such as `{"event":"websocket:connected"}`
//!
//! Server → caller:
//! - Binary frames: PCM16 at the caller rate, one frame per message
//! - `{"action":"clear"}` to drop queued playback on barge-in

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

pub fn create_media_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/media-stream", get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
