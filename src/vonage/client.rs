//! Outbound calls through the Voice API v2.

use serde::Serialize;
use serde_json::{Value, json};
use zeroize::Zeroizing;

use super::{VonageError, application_jwt};
use crate::config::VonageSettings;

pub const DEFAULT_VONAGE_API_URL: &str = "https://api.nexmo.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct PhoneEndpoint {
    #[serde(rename = "type")]
    kind: &'static str,
    number: String,
}

impl PhoneEndpoint {
    fn phone(number: &str) -> Self {
        Self {
            kind: "phone",
            number: number.to_string(),
        }
    }
}

/// Body of `POST /v2/calls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundCall {
    to: Vec<PhoneEndpoint>,
    from: PhoneEndpoint,
    answer_url: Vec<String>,
    answer_method: &'static str,
    event_url: Vec<String>,
    event_method: &'static str,
}

impl OutboundCall {
    /// Call `to` from `from`; Vonage fetches the NCCO from `answer_url`.
    pub fn new(to: &str, from: &str, answer_url: String, event_url: String) -> Self {
        Self {
            to: vec![PhoneEndpoint::phone(to)],
            from: PhoneEndpoint::phone(from),
            answer_url: vec![answer_url],
            answer_method: "POST",
            event_url: vec![event_url],
            event_method: "POST",
        }
    }
}

/// Voice API client for one application.
#[derive(Clone)]
pub struct VonageClient {
    http: reqwest::Client,
    api_url: String,
    application_id: Option<String>,
    private_key: Option<Zeroizing<String>>,
}

impl std::fmt::Debug for VonageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VonageClient")
            .field("api_url", &self.api_url)
            .field("application_id", &self.application_id)
            .field("configured", &self.is_configured())
            .finish()
    }
}

impl VonageClient {
    pub fn new(http: reqwest::Client, settings: &VonageSettings) -> Self {
        Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            application_id: settings.application_id.clone(),
            private_key: settings.private_key.clone(),
        }
    }

    /// Whether an application id and key are available.
    pub fn is_configured(&self) -> bool {
        self.application_id.is_some() && self.private_key.is_some()
    }

    /// Fresh application token.
    pub fn token(&self) -> Result<String, VonageError> {
        match (&self.application_id, &self.private_key) {
            (Some(application_id), Some(private_key)) => application_jwt(application_id, private_key),
            _ => Err(VonageError::NotConfigured),
        }
    }

    /// Place a call. Returns the Voice API response body.
    ///
    /// # Errors
    /// - `NotConfigured` / `Jwt` before any request is made
    /// - `Upstream` with the response body for non-2xx statuses
    /// - `Transport` when the API cannot be reached
    pub async fn create_call(&self, call: &OutboundCall) -> Result<Value, VonageError> {
        let token = self.token()?;
        tracing::debug!("Signed Vonage application JWT");

        let response = self
            .http
            .post(format!("{}/v2/calls", self.api_url))
            .bearer_auth(token)
            .json(call)
            .send()
            .await?;

        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or_else(|_| json!({}));

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "Vonage Voice API call failed");
            return Err(VonageError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(uuid = ?body.get("uuid"), "Outbound call created");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_call_body() {
        let call = OutboundCall::new(
            "819012345678",
            "81312345678",
            "https://bridge.example.com/answer".to_string(),
            "https://bridge.example.com/event".to_string(),
        );
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({
                "to": [{"type": "phone", "number": "819012345678"}],
                "from": {"type": "phone", "number": "81312345678"},
                "answer_url": ["https://bridge.example.com/answer"],
                "answer_method": "POST",
                "event_url": ["https://bridge.example.com/event"],
                "event_method": "POST"
            })
        );
    }

    #[test]
    fn test_unconfigured_client() {
        let client = VonageClient::new(reqwest::Client::new(), &VonageSettings::default());
        assert!(!client.is_configured());
        assert!(matches!(client.token(), Err(VonageError::NotConfigured)));
    }
}
