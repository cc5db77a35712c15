use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::errors::auth_error::AuthError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Read the `x-api-key` header.
fn extract_api_key(request: &Request) -> Result<&str, AuthError> {
    let value = request
        .headers()
        .get(API_KEY_HEADER)
        .ok_or(AuthError::MissingApiKey)?;
    let key = value.to_str().map_err(|_| AuthError::InvalidApiKey)?.trim();
    if key.is_empty() {
        return Err(AuthError::MissingApiKey);
    }
    Ok(key)
}

/// Guard for call-control routes.
///
/// With no keys configured every request passes. Otherwise a missing key is
/// rejected with 401 and an unknown key with 403.
pub async fn api_key_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if !state.config.has_connect_auth() {
        return Ok(next.run(request).await);
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let key = match extract_api_key(&request) {
        Ok(key) => key,
        Err(e) => {
            tracing::warn!(%method, %path, "Request rejected: {}", e);
            return Err(e);
        }
    };

    if !state.config.connect_api_keys.contains(key) {
        tracing::warn!(%method, %path, "Request rejected: unknown API key");
        return Err(AuthError::InvalidApiKey);
    }

    tracing::debug!(%method, %path, "API key accepted");
    Ok(next.run(request).await)
}
