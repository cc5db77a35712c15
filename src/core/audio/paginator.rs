//! Frame pagination and delivery pacing for outbound audio.
//!
//! The paginator turns a continuous PCM16 byte stream into fixed-size frames.
//! Under [`DeliveryPolicy::Immediate`] every appended chunk is sliced right
//! away and the trailing partial frame is dropped. Under
//! [`DeliveryPolicy::Buffered`] audio accumulates until the relay's pacing
//! timer fires ([`FramePaginator::drain_ready`]) or the response completes
//! ([`FramePaginator::flush_complete`]).
//!
//! A frame shorter than the configured size is only produced by
//! `flush_complete`.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Default pacing period for [`DeliveryPolicy::Buffered`].
pub const DEFAULT_DELIVERY_INTERVAL_MS: u64 = 1000;

/// How resampled audio is handed to the caller transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Slice and send as soon as audio arrives; partial frames are discarded
    Immediate,
    /// Accumulate and drain on a fixed interval or on response completion
    Buffered {
        /// Pacing period in milliseconds
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
    },
}

fn default_interval_ms() -> u64 {
    DEFAULT_DELIVERY_INTERVAL_MS
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::Immediate
    }
}

impl DeliveryPolicy {
    /// Parse from string, with fallback to [`DeliveryPolicy::Immediate`].
    pub fn from_str_or_default(s: &str, interval_ms: Option<u64>) -> Self {
        match s.trim().to_lowercase().as_str() {
            "buffered" | "paced" => Self::Buffered {
                interval_ms: interval_ms.unwrap_or(DEFAULT_DELIVERY_INTERVAL_MS),
            },
            _ => Self::Immediate,
        }
    }

    /// Pacing period, if this policy uses a timer.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            Self::Immediate => None,
            Self::Buffered { interval_ms } => Some(Duration::from_millis((*interval_ms).max(1))),
        }
    }

    pub fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered { .. })
    }
}

/// Slices outbound audio into frames of `frame_bytes`.
#[derive(Debug)]
pub struct FramePaginator {
    frame_bytes: usize,
    policy: DeliveryPolicy,
    pending: BytesMut,
}

impl FramePaginator {
    pub fn new(frame_bytes: usize, policy: DeliveryPolicy) -> Self {
        let frame_bytes = frame_bytes.max(2);
        Self {
            frame_bytes,
            policy,
            pending: BytesMut::with_capacity(frame_bytes * 4),
        }
    }

    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// Bytes waiting for delivery.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Add resampled audio.
    ///
    /// Returns the frames to send now: every complete frame under the
    /// immediate policy, nothing under the buffered policy.
    pub fn append(&mut self, audio: &[u8]) -> Vec<Bytes> {
        match self.policy {
            DeliveryPolicy::Immediate => {
                let frames: Vec<Bytes> = audio
                    .chunks_exact(self.frame_bytes)
                    .map(Bytes::copy_from_slice)
                    .collect();
                let dropped = audio.len() % self.frame_bytes;
                if dropped > 0 {
                    tracing::trace!(dropped, "Discarding partial outbound frame");
                }
                frames
            }
            DeliveryPolicy::Buffered { .. } => {
                self.pending.extend_from_slice(audio);
                Vec::new()
            }
        }
    }

    /// Drain every complete frame, keeping a trailing partial frame buffered.
    pub fn drain_ready(&mut self) -> Vec<Bytes> {
        let ready = self.pending.len() / self.frame_bytes * self.frame_bytes;
        if ready == 0 {
            return Vec::new();
        }
        let mut chunk = self.pending.split_to(ready).freeze();
        let mut frames = Vec::with_capacity(ready / self.frame_bytes);
        while !chunk.is_empty() {
            frames.push(chunk.split_to(self.frame_bytes));
        }
        frames
    }

    /// Drain everything, including a final short frame, and clear the buffer.
    pub fn flush_complete(&mut self) -> Vec<Bytes> {
        let mut frames = self.drain_ready();
        if !self.pending.is_empty() {
            frames.push(self.pending.split().freeze());
        }
        frames
    }

    /// Discard all buffered audio.
    pub fn reset(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(discarded = self.pending.len(), "Discarding buffered outbound audio");
        }
        self.pending.clear();
    }
}
