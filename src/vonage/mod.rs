//! Vonage Voice API call control.
//!
//! - [`ncco`] builds the call control object returned by `/answer`
//! - [`jwt`] signs application tokens for the REST API
//! - [`client`] places outbound calls

pub mod client;
pub mod jwt;
pub mod ncco;

use thiserror::Error;

pub use client::{DEFAULT_VONAGE_API_URL, OutboundCall, VonageClient};
pub use jwt::{ApplicationClaims, JWT_TTL_SECS, application_jwt};
pub use ncco::{
    DEFAULT_TALK_LANGUAGE, DEFAULT_TALK_TEXT, MEDIA_CONTENT_TYPE, NccoAction, NccoEndpoint,
    answer_ncco,
};

/// Errors raised while talking to the Vonage Voice API.
#[derive(Debug, Error)]
pub enum VonageError {
    /// Application id or private key is missing
    #[error("Vonage application id or private key is not configured")]
    NotConfigured,

    #[error("Failed to sign Vonage JWT: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Non-2xx response; `body` is the parsed response or `{}`
    #[error("Vonage API returned status {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Failed to reach Vonage API: {0}")]
    Transport(#[from] reqwest::Error),
}
