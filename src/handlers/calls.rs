//! Vonage Voice webhooks and outbound call control.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;
use crate::vonage::{OutboundCall, answer_ncco};

/// Body of `POST /connect`.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    /// Destination in E.164
    pub to: Option<String>,
    /// Caller id; falls back to the configured default
    pub from: Option<String>,
}

/// Vonage call events. Logged and acknowledged.
pub async fn event(body: Bytes) -> &'static str {
    match serde_json::from_slice::<Value>(&body) {
        Ok(event) => info!(status = ?event.get("status"), event = %event, "Vonage event"),
        Err(_) if body.is_empty() => info!("Vonage event with empty body"),
        Err(_) => info!(event = %String::from_utf8_lossy(&body), "Vonage event (non-JSON)"),
    }
    "OK"
}

/// NCCO for an answered call: a short prompt, then the media stream.
pub async fn answer(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let media_stream_url = state.config.media_stream_url();
    info!(%media_stream_url, "Answering call");
    Json(answer_ncco(
        &state.config.ncco.talk_text,
        &state.config.ncco.language,
        &media_stream_url,
    ))
}

/// Place an outbound call that is answered with [`answer`].
///
/// A missing or malformed body is treated as empty.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Value>)> {
    let request: ConnectRequest = serde_json::from_slice(&body).unwrap_or_default();

    let to = non_empty(request.to)
        .ok_or_else(|| AppError::BadRequest("`to` is required, in E.164 format".to_string()))?;
    let from = non_empty(request.from)
        .or_else(|| state.config.vonage.outbound_from.clone())
        .ok_or_else(|| {
            AppError::BadRequest(
                "Specify `from` or set VONAGE_OUTBOUND_FROM".to_string(),
            )
        })?;

    let call = OutboundCall::new(
        &to,
        &from,
        state.config.public_url("/answer"),
        state.config.public_url("/event"),
    );
    let body = state.vonage.create_call(&call).await?;

    Ok((StatusCode::CREATED, Json(body)))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
