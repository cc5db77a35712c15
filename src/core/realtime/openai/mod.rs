//! OpenAI Realtime API module.
//!
//! Audio in both directions is PCM 16-bit signed little-endian at 24kHz,
//! base64 encoded inside JSON events.

mod client;
mod config;
mod messages;

pub use client::OpenAIRealtime;
pub use config::{
    DEFAULT_TEMPERATURE, DEFAULT_TRANSCRIPTION_MODEL, DEFAULT_VOICE, Modality, OPENAI_BETA_HEADER,
    OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, PCM16_FORMAT,
};
pub use messages::{
    ApiError, ClientEvent, ConversationItem, InputAudioTranscription, ResponseConfig, ServerEvent,
    SessionConfig, ToolDef, TurnDetection,
};
