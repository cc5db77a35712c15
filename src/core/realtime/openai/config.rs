//! OpenAI Realtime API defaults.

use serde::{Deserialize, Serialize};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Sample rate of `pcm16` audio on the Realtime API.
pub const OPENAI_REALTIME_SAMPLE_RATE: u32 = 24000;

/// Value of the `OpenAI-Beta` handshake header.
pub const OPENAI_BETA_HEADER: &str = "realtime=v1";

pub const DEFAULT_VOICE: &str = "alloy";
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Audio format name used for both directions.
pub const PCM16_FORMAT: &str = "pcm16";

/// Output modalities for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

impl Modality {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
        }
    }

    /// Text plus audio, the only combination the relay uses.
    pub fn text_and_audio() -> Vec<String> {
        vec![Self::Text.as_str().to_string(), Self::Audio.as_str().to_string()]
    }
}
