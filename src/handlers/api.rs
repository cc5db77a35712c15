use axum::{Json, response::IntoResponse};
use serde_json::json;

/// Service banner.
pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Vonage media stream to OpenAI Realtime bridge is running" }))
}

/// Liveness probe, also served as `/_/metrics`.
pub async fn health_check() -> &'static str {
    "OK"
}
