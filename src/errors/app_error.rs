use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use crate::vonage::VonageError;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to create Vonage JWT")]
    TokenFailed(#[source] VonageError),

    /// Non-2xx from the Voice API, relayed with its status
    #[error("Vonage Voice API call failed")]
    Upstream { status: u16, details: Value },

    #[error("Failed to communicate with Vonage Voice API")]
    BadGateway(#[source] VonageError),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<VonageError> for AppError {
    fn from(err: VonageError) -> Self {
        match err {
            VonageError::NotConfigured | VonageError::Jwt(_) => AppError::TokenFailed(err),
            VonageError::Upstream { status, body } => AppError::Upstream {
                status,
                details: body,
            },
            VonageError::Transport(_) => AppError::BadGateway(err),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TokenFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::TokenFailed(source) | AppError::BadGateway(source) => {
                tracing::error!(error = %source, "{}", self);
            }
            _ => {}
        }
        let body = match self {
            AppError::Upstream { details, .. } => json!({
                "error": "Vonage Voice API call failed",
                "details": details,
            }),
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}
