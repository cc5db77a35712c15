//! PCM16 audio plumbing for the relay.
//!
//! - [`resampler`] converts little-endian PCM16 buffers between sample rates
//!   (24kHz AI output to 16kHz telephony audio in practice).
//! - [`paginator`] slices the resampled stream into fixed-duration frames and
//!   decides when they are handed to the caller transport.

pub mod paginator;
pub mod resampler;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use paginator::{DeliveryPolicy, FramePaginator};
pub use resampler::{ResampleAlgorithm, Resampler, resample};

/// Sample rate of the caller-facing media stream.
pub const TELEPHONY_SAMPLE_RATE: u32 = 16000;

/// Bytes per PCM16 sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Errors raised while converting or framing audio.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// Buffer length is not a whole number of 16-bit samples
    #[error("Invalid buffer length: {0} bytes is not a whole number of PCM16 samples")]
    InvalidBufferLength(usize),

    /// A sample rate of zero was supplied
    #[error("Invalid sample rate: {source_rate}Hz -> {target_rate}Hz")]
    InvalidSampleRate { source_rate: u32, target_rate: u32 },

    /// The algorithm cannot express this conversion
    #[error("{algorithm} cannot convert {source_rate}Hz -> {target_rate}Hz")]
    UnsupportedRatio {
        algorithm: ResampleAlgorithm,
        source_rate: u32,
        target_rate: u32,
    },
}

pub type AudioResult<T> = Result<T, AudioError>;

/// Audio format description shared by the relay settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// Samples per second
    pub sample_rate: u32,
    /// Frame duration in milliseconds
    pub frame_duration_ms: u32,
}

impl PcmFormat {
    /// Size in bytes of one mono PCM16 frame.
    ///
    /// 20ms at 16kHz is 640 bytes.
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        self.sample_rate as usize * self.frame_duration_ms as usize / 1000 * BYTES_PER_SAMPLE
    }

    /// Duration in milliseconds of `len` bytes of audio in this format.
    #[inline]
    pub fn duration_ms(&self, len: usize) -> u64 {
        let samples = (len / BYTES_PER_SAMPLE) as u64;
        samples * 1000 / self.sample_rate.max(1) as u64
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: TELEPHONY_SAMPLE_RATE,
            frame_duration_ms: 20,
        }
    }
}
