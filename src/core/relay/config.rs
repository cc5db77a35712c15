use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::audio::{
    AudioResult, DeliveryPolicy, FramePaginator, PcmFormat, ResampleAlgorithm, Resampler,
    TELEPHONY_SAMPLE_RATE,
};
use crate::core::realtime::OPENAI_REALTIME_SAMPLE_RATE;
use crate::core::turn::{TruncationPolicy, TurnController};

pub const DEFAULT_SESSION_UPDATE_DELAY_MS: u64 = 250;
pub const DEFAULT_GREETING_DELAY_MS: u64 = 1000;
pub const DEFAULT_FRAME_DURATION_MS: u32 = 20;

/// Per-call relay policy, shared by every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub resample_algorithm: ResampleAlgorithm,
    pub delivery: DeliveryPolicy,
    /// Caller-side audio format
    pub caller_format: PcmFormat,
    /// Sample rate of `pcm16` audio on the AI side, both directions
    pub ai_sample_rate: u32,
    /// Delay between the AI transport opening and `session.update`
    pub session_update_delay_ms: u64,
    /// Delay between the AI transport opening and the greeting request
    pub greeting_delay_ms: u64,
    /// Ask the AI to speak first
    pub send_greeting: bool,
    pub truncation: TruncationPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            resample_algorithm: ResampleAlgorithm::default(),
            delivery: DeliveryPolicy::default(),
            caller_format: PcmFormat {
                sample_rate: TELEPHONY_SAMPLE_RATE,
                frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            },
            ai_sample_rate: OPENAI_REALTIME_SAMPLE_RATE,
            session_update_delay_ms: DEFAULT_SESSION_UPDATE_DELAY_MS,
            greeting_delay_ms: DEFAULT_GREETING_DELAY_MS,
            send_greeting: true,
            truncation: TruncationPolicy::default(),
        }
    }
}

impl RelayConfig {
    pub fn session_update_delay(&self) -> Duration {
        Duration::from_millis(self.session_update_delay_ms)
    }

    /// Never earlier than the session update.
    pub fn greeting_delay(&self) -> Duration {
        Duration::from_millis(self.greeting_delay_ms.max(self.session_update_delay_ms))
    }

    /// Outbound audio resampler, AI rate to caller rate.
    pub fn resampler(&self) -> AudioResult<Resampler> {
        Resampler::new(
            self.resample_algorithm,
            self.ai_sample_rate,
            self.caller_format.sample_rate,
        )
    }

    /// Fresh turn controller for one call.
    pub fn turn_controller(&self) -> AudioResult<TurnController> {
        Ok(TurnController::new(
            self.resampler()?,
            FramePaginator::new(self.caller_format.frame_bytes(), self.delivery),
            self.truncation,
            self.ai_sample_rate,
        ))
    }
}
