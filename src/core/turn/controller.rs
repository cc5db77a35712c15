use bytes::Bytes;
use tokio::time::Instant;

use super::state::{ResponseClock, TruncationPolicy, TurnState};
use crate::core::audio::{AudioResult, BYTES_PER_SAMPLE, FramePaginator, Resampler};

/// Side effect requested by the turn controller.
///
/// The controller never performs I/O; the relay executes these in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnCommand {
    /// Send one audio frame to the caller
    PlayFrame(Bytes),
    /// Tell the caller transport to drop queued playback
    ClearPlayback,
    /// Ask the AI to truncate an item at `audio_end_ms`
    Truncate { item_id: String, audio_end_ms: u64 },
    /// Start the delivery timer (buffered policy only)
    StartPacing,
    /// Stop the delivery timer (buffered policy only)
    StopPacing,
}

/// Barge-in aware owner of the outbound audio path for one call.
#[derive(Debug)]
pub struct TurnController {
    state: TurnState,
    resampler: Resampler,
    paginator: FramePaginator,
    policy: TruncationPolicy,
    /// Rate the AI assumes for forwarded caller audio
    input_sample_rate: u32,
    input_audio_bytes: u64,
    truncated_item: Option<String>,
}

impl TurnController {
    pub fn new(
        resampler: Resampler,
        paginator: FramePaginator,
        policy: TruncationPolicy,
        input_sample_rate: u32,
    ) -> Self {
        Self {
            state: TurnState::Idle,
            resampler,
            paginator,
            policy,
            input_sample_rate,
            input_audio_bytes: 0,
            truncated_item: None,
        }
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn passthrough_enabled(&self) -> bool {
        self.state.passthrough_enabled()
    }

    /// Item currently producing audio, if any.
    pub fn current_item_id(&self) -> Option<&str> {
        match &self.state {
            TurnState::Responding { item_id, .. } => Some(item_id),
            _ => None,
        }
    }

    pub fn response_started_at(&self) -> Option<Instant> {
        match &self.state {
            TurnState::Responding {
                started: Some(clock),
                ..
            } => Some(clock.wall),
            _ => None,
        }
    }

    /// Bytes of resampled audio waiting in the paginator.
    pub fn pending_audio(&self) -> usize {
        self.paginator.pending_len()
    }

    /// Caller audio forwarded to the AI so far, in milliseconds on the AI's
    /// input timeline.
    ///
    /// Caller frames are forwarded unconverted, so this is measured at
    /// `input_sample_rate` rather than the caller's own rate. Speech offsets
    /// reported by the AI count the same bytes at the same rate.
    pub fn input_audio_ms(&self) -> u64 {
        self.input_audio_bytes * 1000
            / (self.input_sample_rate.max(1) as u64 * BYTES_PER_SAMPLE as u64)
    }

    /// Account for caller audio forwarded to the AI.
    pub fn note_input_audio(&mut self, len: usize) {
        self.input_audio_bytes += len as u64;
    }

    fn pacing(&self, command: TurnCommand) -> Option<TurnCommand> {
        self.paginator.policy().is_buffered().then_some(command)
    }

    fn start_response(&mut self, item_id: String, started: Option<ResponseClock>) -> Vec<TurnCommand> {
        tracing::debug!(item_id = %item_id, "Assistant response started");
        self.state = TurnState::Responding { item_id, started };
        self.pacing(TurnCommand::StartPacing).into_iter().collect()
    }

    /// `conversation.item.created`; only assistant items open a turn.
    pub fn on_item_created(&mut self, item_id: &str, role: Option<&str>) -> Vec<TurnCommand> {
        if role != Some("assistant") {
            return Vec::new();
        }

        match &mut self.state {
            TurnState::Idle => {}
            TurnState::Responding { item_id: current, started } => {
                if current.as_str() != item_id {
                    tracing::debug!(previous = %current, item_id = %item_id, "Assistant item replaced");
                    *current = item_id.to_string();
                    *started = None;
                }
            }
            TurnState::Interrupting { next_item_id, .. } => {
                tracing::debug!(item_id = %item_id, "Parking assistant item until truncation is confirmed");
                *next_item_id = Some(item_id.to_string());
                return Vec::new();
            }
        }
        if matches!(self.state, TurnState::Idle) {
            return self.start_response(item_id.to_string(), None);
        }
        Vec::new()
    }

    /// `response.audio.delta` with decoded PCM16 at the AI's rate.
    ///
    /// Returns the frames ready for the caller under the active delivery
    /// policy.
    pub fn on_audio_delta(
        &mut self,
        item_id: &str,
        audio: &[u8],
        now: Instant,
    ) -> AudioResult<Vec<TurnCommand>> {
        if !self.passthrough_enabled() {
            tracing::trace!(item_id = %item_id, bytes = audio.len(), "Dropping audio while interrupting");
            return Ok(Vec::new());
        }
        if self.truncated_item.as_deref() == Some(item_id) {
            tracing::trace!(item_id = %item_id, "Dropping audio for truncated item");
            return Ok(Vec::new());
        }

        let resampled = self.resampler.process(audio)?;
        let clock = ResponseClock {
            wall: now,
            input_audio_ms: self.input_audio_ms(),
        };

        let mut commands = Vec::new();
        if let TurnState::Responding { item_id: current, started } = &mut self.state {
            if current.as_str() != item_id {
                *current = item_id.to_string();
                *started = None;
            }
            if started.is_none() {
                *started = Some(clock);
            }
        } else {
            // Audio without a prior item notice still opens the turn
            commands.extend(self.start_response(item_id.to_string(), Some(clock)));
        }

        commands.extend(
            self.paginator
                .append(&resampled)
                .into_iter()
                .map(TurnCommand::PlayFrame),
        );
        Ok(commands)
    }

    /// `input_audio_buffer.speech_started`.
    ///
    /// While a response is in flight this mutes passthrough, drops buffered
    /// audio and returns the truncate and clear instructions. Otherwise it
    /// does nothing.
    pub fn on_speech_started(
        &mut self,
        audio_start_ms: Option<u64>,
        now: Instant,
    ) -> Vec<TurnCommand> {
        let (item_id, started) = match &self.state {
            TurnState::Responding { item_id, started } => (item_id.clone(), *started),
            _ => {
                tracing::debug!(state = %self.state, "Speech started with no response in flight");
                return Vec::new();
            }
        };

        let elapsed = match started {
            Some(clock) => clock.elapsed_ms(audio_start_ms, now),
            None => self.policy.fallback_ms,
        };
        let audio_end_ms = self.policy.clamp(elapsed);

        self.paginator.reset();
        self.truncated_item = Some(item_id.clone());
        self.state = TurnState::Interrupting {
            item_id: item_id.clone(),
            next_item_id: None,
        };

        tracing::info!(
            item_id = %item_id,
            elapsed_ms = elapsed,
            audio_end_ms,
            "Caller barged in, truncating response"
        );

        let mut commands: Vec<TurnCommand> =
            self.pacing(TurnCommand::StopPacing).into_iter().collect();
        commands.push(TurnCommand::Truncate {
            item_id,
            audio_end_ms,
        });
        commands.push(TurnCommand::ClearPlayback);
        commands
    }

    /// `conversation.item.truncated`.
    pub fn on_item_truncated(&mut self, item_id: &str) -> Vec<TurnCommand> {
        let TurnState::Interrupting {
            item_id: pending,
            next_item_id,
        } = &self.state
        else {
            tracing::debug!(item_id = %item_id, state = %self.state, "Truncation confirmed outside an interruption");
            return Vec::new();
        };

        if pending != item_id {
            tracing::debug!(expected = %pending, item_id = %item_id, "Truncation confirmed for a different item");
        }
        let next = next_item_id.clone();
        self.resume(next)
    }

    /// The AI rejected the pending `conversation.item.truncate`. The
    /// confirmation will never arrive, so passthrough is restored.
    ///
    /// Errors unrelated to the truncation leave the interruption in place.
    pub fn on_truncate_rejected(&mut self) -> Vec<TurnCommand> {
        match &self.state {
            TurnState::Interrupting { item_id, next_item_id } => {
                tracing::warn!(item_id = %item_id, "Truncation rejected, resuming playback");
                let next = next_item_id.clone();
                self.resume(next)
            }
            _ => Vec::new(),
        }
    }

    fn resume(&mut self, next_item_id: Option<String>) -> Vec<TurnCommand> {
        self.paginator.reset();
        match next_item_id {
            Some(next) => self.start_response(next, None),
            None => {
                self.state = TurnState::Idle;
                Vec::new()
            }
        }
    }

    /// `response.done`: final burst, then idle.
    pub fn on_response_done(&mut self) -> Vec<TurnCommand> {
        if !self.passthrough_enabled() {
            return Vec::new();
        }

        let mut commands: Vec<TurnCommand> = self
            .paginator
            .flush_complete()
            .into_iter()
            .map(TurnCommand::PlayFrame)
            .collect();
        if let Some(stop) = self.pacing(TurnCommand::StopPacing) {
            commands.push(stop);
        }
        if matches!(self.state, TurnState::Responding { .. }) {
            tracing::debug!(state = %self.state, "Response complete");
        }
        self.state = TurnState::Idle;
        commands
    }

    /// Delivery timer tick (buffered policy).
    pub fn on_pacing_tick(&mut self) -> Vec<TurnCommand> {
        if !self.passthrough_enabled() {
            return Vec::new();
        }
        self.paginator
            .drain_ready()
            .into_iter()
            .map(TurnCommand::PlayFrame)
            .collect()
    }
}
