//! Base types for the realtime speech AI transport.
//!
//! A provider connection is exposed to the relay as a [`RealtimeLink`]: a pair
//! of channels plus a cancellation token. The provider task owns the socket;
//! the relay owns the link and never touches the network directly. This keeps
//! every state transition of a call on the relay's single event loop.
//!
//! # Audio Format
//!
//! The AI side consumes and produces PCM 16-bit signed little-endian audio,
//! base64 encoded inside JSON events.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use super::openai::{ClientEvent, TurnDetection};

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the realtime transport.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the provider failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication material is missing or malformed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The link has been closed
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration
// =============================================================================

/// Connection and session settings for a realtime provider.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: Zeroizing<String>,
    /// WebSocket endpoint without query string
    pub url: String,
    /// Model passed as the `model` query parameter
    pub model: String,
    /// Voice for audio output
    pub voice: String,
    /// System instructions for the assistant
    pub instructions: String,
    /// Temperature for response generation
    pub temperature: f32,
    /// Input transcription model, `None` disables transcription
    pub transcription_model: Option<String>,
    /// Turn detection sent with `session.update`
    pub turn_detection: TurnDetection,
    /// Response modalities
    pub modalities: Vec<String>,
    /// Tool choice strategy
    pub tool_choice: String,
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("api_key", &"[REDACTED]")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("voice", &self.voice)
            .field("temperature", &self.temperature)
            .field("transcription_model", &self.transcription_model)
            .field("turn_detection", &self.turn_detection)
            .field("modalities", &self.modalities)
            .field("tool_choice", &self.tool_choice)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// State of the AI transport as seen by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Handshake in progress; audio appends are dropped
    #[default]
    Connecting,
    /// Ready to accept events
    Open,
    /// Closed by either side
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

// =============================================================================
// Link
// =============================================================================

/// Notification from the provider task to the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeInbound {
    /// Transport handshake completed
    Opened,
    /// One JSON event, unparsed
    Event(String),
    /// Transport ended; `reason` is set for failures and close frames
    Closed { reason: Option<String> },
}

/// Relay-side handle to an AI transport.
#[derive(Debug)]
pub struct RealtimeLink {
    commands: mpsc::Sender<ClientEvent>,
    events: mpsc::Receiver<RealtimeInbound>,
    shutdown: CancellationToken,
}

/// Provider-side ends of a [`RealtimeLink`].
#[derive(Debug)]
pub struct RealtimeLinkRemote {
    pub commands: mpsc::Receiver<ClientEvent>,
    pub events: mpsc::Sender<RealtimeInbound>,
    pub shutdown: CancellationToken,
}

impl RealtimeLink {
    /// Create a connected link/remote pair.
    pub fn channel(capacity: usize) -> (RealtimeLink, RealtimeLinkRemote) {
        let (command_tx, command_rx) = mpsc::channel(capacity);
        let (event_tx, event_rx) = mpsc::channel(capacity);
        let shutdown = CancellationToken::new();
        (
            RealtimeLink {
                commands: command_tx,
                events: event_rx,
                shutdown: shutdown.clone(),
            },
            RealtimeLinkRemote {
                commands: command_rx,
                events: event_tx,
                shutdown,
            },
        )
    }

    /// Queue an event for the provider.
    pub async fn send(&self, event: ClientEvent) -> RealtimeResult<()> {
        self.commands
            .send(event)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    /// Next notification from the provider, `None` once the task is gone.
    pub async fn recv(&mut self) -> Option<RealtimeInbound> {
        self.events.recv().await
    }

    /// Ask the provider task to close the socket. Idempotent.
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.commands.is_closed()
    }
}

impl Drop for RealtimeLink {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// =============================================================================
// Connector
// =============================================================================

/// Opens one AI transport per call.
///
/// `connect` returns as soon as the provider task is spawned; the handshake
/// result arrives on the link as [`RealtimeInbound::Opened`] or
/// [`RealtimeInbound::Closed`].
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    async fn connect(&self) -> RealtimeResult<RealtimeLink>;

    /// Provider name for logs.
    fn provider(&self) -> &'static str;
}
