//! OpenAI Realtime API connector.
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Handshake headers: `Authorization: Bearer <key>`, `OpenAI-Beta: realtime=v1`
//! - Protocol: WebSocket with JSON events
//!
//! Each [`RealtimeConnector::connect`] spawns one connection task bound to a
//! [`RealtimeLink`]. The task forwards serialized [`ClientEvent`]s to the
//! socket and raw text frames back to the relay. There is no reconnection: a
//! lost socket ends the call.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tracing::Instrument;

use super::config::{OPENAI_BETA_HEADER, PCM16_FORMAT};
use super::messages::{ClientEvent, InputAudioTranscription, SessionConfig, ToolDef};
use crate::core::realtime::base::{
    RealtimeConfig, RealtimeConnector, RealtimeError, RealtimeInbound, RealtimeLink,
    RealtimeLinkRemote, RealtimeResult,
};

/// Channel capacity for the link in both directions.
const WS_CHANNEL_CAPACITY: usize = 256;

/// OpenAI Realtime connector. Cheap to clone, shared by all calls.
#[derive(Debug, Clone)]
pub struct OpenAIRealtime {
    config: Arc<RealtimeConfig>,
}

impl OpenAIRealtime {
    pub fn new(config: RealtimeConfig) -> RealtimeResult<Self> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        if config.model.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "model is required".to_string(),
            ));
        }
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn voice(&self) -> &str {
        &self.config.voice
    }

    /// WebSocket URL with the model parameter.
    pub fn build_ws_url(&self) -> String {
        let separator = if self.config.url.contains('?') { '&' } else { '?' };
        format!("{}{}model={}", self.config.url, separator, self.config.model)
    }

    /// Session configuration advertised with `session.update`.
    pub fn session_config(&self, tools: Vec<ToolDef>) -> SessionConfig {
        SessionConfig {
            modalities: Some(self.config.modalities.clone()),
            instructions: Some(self.config.instructions.clone()),
            voice: Some(self.config.voice.clone()),
            input_audio_format: Some(PCM16_FORMAT.to_string()),
            output_audio_format: Some(PCM16_FORMAT.to_string()),
            input_audio_transcription: self
                .config
                .transcription_model
                .as_ref()
                .map(|model| InputAudioTranscription {
                    model: model.clone(),
                }),
            turn_detection: Some(self.config.turn_detection.clone()),
            tool_choice: (!tools.is_empty()).then(|| self.config.tool_choice.clone()),
            tools: (!tools.is_empty()).then_some(tools),
            temperature: Some(self.config.temperature),
        }
    }

    fn build_request(&self) -> RealtimeResult<Request> {
        let mut request = self
            .build_ws_url()
            .into_client_request()
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key.as_str()))
            .map_err(|e| RealtimeError::AuthenticationFailed(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert(http::header::AUTHORIZATION, bearer);
        headers.insert("openai-beta", HeaderValue::from_static(OPENAI_BETA_HEADER));
        Ok(request)
    }
}

#[async_trait]
impl RealtimeConnector for OpenAIRealtime {
    async fn connect(&self) -> RealtimeResult<RealtimeLink> {
        let request = self.build_request()?;
        let (link, remote) = RealtimeLink::channel(WS_CHANNEL_CAPACITY);

        tracing::debug!(model = %self.config.model, "Opening OpenAI Realtime connection");
        tokio::spawn(run_connection(request, remote).in_current_span());
        Ok(link)
    }

    fn provider(&self) -> &'static str {
        "openai"
    }
}

/// Owns the socket for one call until either side closes.
async fn run_connection(request: Request, remote: RealtimeLinkRemote) {
    let RealtimeLinkRemote {
        mut commands,
        events,
        shutdown,
    } = remote;

    let connected = tokio::select! {
        _ = shutdown.cancelled() => {
            tracing::debug!("Connection cancelled before handshake completed");
            return;
        }
        result = tokio_tungstenite::connect_async(request) => result,
    };

    let ws_stream = match connected {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            tracing::error!("Failed to connect to OpenAI Realtime API: {}", e);
            let _ = events
                .send(RealtimeInbound::Closed {
                    reason: Some(RealtimeError::ConnectionFailed(e.to_string()).to_string()),
                })
                .await;
            return;
        }
    };

    tracing::info!("Connected to OpenAI Realtime API");
    if events.send(RealtimeInbound::Opened).await.is_err() {
        return;
    }

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = ws_sink.send(Message::Close(None)).await;
                break None;
            }

            command = commands.recv() => {
                let Some(event) = command else {
                    let _ = ws_sink.send(Message::Close(None)).await;
                    break None;
                };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::error!("Failed to serialize {}: {}", event.event_type(), e);
                        continue;
                    }
                };
                if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                    tracing::error!("Failed to send WebSocket message: {}", e);
                    break Some(RealtimeError::WebSocketError(e.to_string()).to_string());
                }
            }

            message = ws_stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if events.send(RealtimeInbound::Event(text.as_str().to_owned())).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                        tracing::error!("Failed to send pong: {}", e);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!("WebSocket closed by server");
                    break frame.map(|f| f.reason.as_str().to_owned()).filter(|r| !r.is_empty());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::trace!(bytes = data.len(), "Ignoring binary frame from OpenAI");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!("WebSocket error: {}", e);
                    break Some(RealtimeError::WebSocketError(e.to_string()).to_string());
                }
                None => break None,
            },
        }
    };

    let _ = events.send(RealtimeInbound::Closed { reason }).await;
    tracing::info!("OpenAI Realtime connection task ended");
}

#[cfg(test)]
mod tests {
    use zeroize::Zeroizing;

    use super::*;
    use crate::core::realtime::openai::{Modality, OPENAI_REALTIME_URL, TurnDetection};

    fn config() -> RealtimeConfig {
        RealtimeConfig {
            api_key: Zeroizing::new("sk-test".to_string()),
            url: OPENAI_REALTIME_URL.to_string(),
            model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
            voice: "alloy".to_string(),
            instructions: "Be brief.".to_string(),
            temperature: 0.8,
            transcription_model: Some("whisper-1".to_string()),
            turn_detection: TurnDetection::server_vad(),
            modalities: Modality::text_and_audio(),
            tool_choice: "auto".to_string(),
        }
    }

    #[test]
    fn test_requires_api_key() {
        let err = OpenAIRealtime::new(RealtimeConfig {
            api_key: Zeroizing::new(String::new()),
            ..config()
        })
        .unwrap_err();
        assert!(matches!(err, RealtimeError::AuthenticationFailed(_)));
    }

    #[test]
    fn test_requires_model() {
        let err = OpenAIRealtime::new(RealtimeConfig {
            model: String::new(),
            ..config()
        })
        .unwrap_err();
        assert!(matches!(err, RealtimeError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_ws_url() {
        let client = OpenAIRealtime::new(config()).unwrap();
        assert_eq!(
            client.build_ws_url(),
            "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview-2024-10-01"
        );
    }

    #[test]
    fn test_request_headers() {
        let client = OpenAIRealtime::new(config()).unwrap();
        let request = client.build_request().unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer sk-test");
        assert_eq!(request.headers()["openai-beta"], "realtime=v1");
    }

    #[test]
    fn test_session_config() {
        let client = OpenAIRealtime::new(config()).unwrap();
        let tool = ToolDef::function("get_weather", "Weather", serde_json::json!({}));
        let session = client.session_config(vec![tool]);

        assert_eq!(session.input_audio_format.as_deref(), Some("pcm16"));
        assert_eq!(session.output_audio_format.as_deref(), Some("pcm16"));
        assert_eq!(session.voice.as_deref(), Some("alloy"));
        assert_eq!(session.temperature, Some(0.8));
        assert_eq!(session.tool_choice.as_deref(), Some("auto"));
        assert_eq!(session.tools.unwrap().len(), 1);
        assert_eq!(
            session.input_audio_transcription.unwrap().model,
            "whisper-1"
        );
    }

    #[test]
    fn test_session_config_without_tools() {
        let client = OpenAIRealtime::new(config()).unwrap();
        let session = client.session_config(Vec::new());
        assert!(session.tools.is_none());
        assert!(session.tool_choice.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_closed() {
        let client = OpenAIRealtime::new(RealtimeConfig {
            url: "ws://127.0.0.1:9".to_string(),
            ..config()
        })
        .unwrap();
        let mut link = client.connect().await.unwrap();
        match link.recv().await {
            Some(RealtimeInbound::Closed { reason }) => assert!(reason.is_some()),
            other => panic!("Expected Closed, got {other:?}"),
        }
    }
}
