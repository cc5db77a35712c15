//! Per-call bridge between the caller media stream and the realtime AI.
//!
//! One [`SessionRelay`] runs per accepted media WebSocket. It owns:
//! - the caller side as a [`CallerLink`] (frames in, audio/clear/close out)
//! - the AI side as a [`RealtimeLink`](crate::core::realtime::RealtimeLink)
//! - the [`TurnController`](crate::core::turn::TurnController) for barge-in
//!
//! Every event for a call is handled on the relay's own task, so no state is
//! shared between the transports.

mod config;
mod session;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::audio::AudioError;
use crate::core::realtime::RealtimeError;

pub use config::{
    DEFAULT_FRAME_DURATION_MS, DEFAULT_GREETING_DELAY_MS, DEFAULT_SESSION_UPDATE_DELAY_MS,
    RelayConfig,
};
pub use session::{CloseReason, SessionRelay};

/// Lifecycle event Vonage sends once the media stream is connected.
pub const WEBSOCKET_CONNECTED_EVENT: &str = "websocket:connected";

/// Errors raised inside a relay session.
#[derive(Debug, Error)]
pub enum RelayError {
    /// One side of the call is gone; expected at teardown
    #[error("{0} transport closed")]
    TransportClosed(Side),

    /// An inbound message could not be interpreted
    #[error("Unhandled message: {reason}")]
    UnhandledMessage { reason: String, raw: String },

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Realtime error: {0}")]
    Realtime(#[from] RealtimeError),
}

/// Which transport an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Caller,
    Ai,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Caller => write!(f, "Caller"),
            Side::Ai => write!(f, "AI"),
        }
    }
}

// =============================================================================
// Caller Link
// =============================================================================

/// Frame received from the caller's media WebSocket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerInbound {
    /// Binary or text payload, classified by the relay
    Frame(Bytes),
    /// The caller hung up or the socket failed
    Closed,
}

/// Instruction for the caller's media WebSocket writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerOutbound {
    /// One PCM16 frame, sent as a binary message
    Audio(Bytes),
    /// Drop queued playback, sent as `{"action":"clear"}`
    Clear,
    /// Close the socket
    Close,
}

impl CallerOutbound {
    /// Text payload of the clear instruction.
    pub const CLEAR_PAYLOAD: &'static str = r#"{"action":"clear"}"#;
}

/// Relay-side ends of the caller transport.
#[derive(Debug)]
pub struct CallerLink {
    pub inbound: mpsc::Receiver<CallerInbound>,
    pub outbound: mpsc::Sender<CallerOutbound>,
}

/// Socket-side ends of the caller transport.
#[derive(Debug)]
pub struct CallerRemote {
    pub inbound: mpsc::Sender<CallerInbound>,
    pub outbound: mpsc::Receiver<CallerOutbound>,
}

impl CallerLink {
    pub fn channel(capacity: usize) -> (CallerLink, CallerRemote) {
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        (
            CallerLink {
                inbound: inbound_rx,
                outbound: outbound_tx,
            },
            CallerRemote {
                inbound: inbound_tx,
                outbound: outbound_rx,
            },
        )
    }
}

/// How a caller frame should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// JSON object carrying an `event` field
    Lifecycle(String),
    /// Anything else is raw PCM16 audio
    Audio,
}

/// Classify a caller frame by whether it parses as a lifecycle event.
pub fn classify_frame(payload: &[u8]) -> InboundFrame {
    let looks_like_json = payload
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');
    if !looks_like_json {
        return InboundFrame::Audio;
    }

    match serde_json::from_slice::<serde_json::Value>(payload) {
        Ok(value) => match value.get("event").and_then(|e| e.as_str()) {
            Some(event) => InboundFrame::Lifecycle(event.to_string()),
            None => InboundFrame::Audio,
        },
        Err(_) => InboundFrame::Audio,
    }
}
