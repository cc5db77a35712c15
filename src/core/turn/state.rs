//! Turn states and truncation bounds.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Lower bound for a truncation offset.
pub const DEFAULT_TRUNCATE_MIN_MS: u64 = 500;
/// Upper bound for a truncation offset.
pub const DEFAULT_TRUNCATE_MAX_MS: u64 = 5000;
/// Offset used when no response start was recorded.
pub const DEFAULT_TRUNCATE_FALLBACK_MS: u64 = 1500;

/// Bounds applied to the offset sent with `conversation.item.truncate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruncationPolicy {
    pub min_ms: u64,
    pub max_ms: u64,
    pub fallback_ms: u64,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            min_ms: DEFAULT_TRUNCATE_MIN_MS,
            max_ms: DEFAULT_TRUNCATE_MAX_MS,
            fallback_ms: DEFAULT_TRUNCATE_FALLBACK_MS,
        }
    }
}

impl TruncationPolicy {
    /// Clamp `elapsed_ms` into `[min_ms, max_ms]`.
    ///
    /// A misconfigured policy with `min_ms > max_ms` resolves to `max_ms`.
    pub fn clamp(&self, elapsed_ms: u64) -> u64 {
        elapsed_ms.max(self.min_ms).min(self.max_ms)
    }
}

/// When the current response started producing audio.
///
/// Two clocks are kept: the wall clock for the fallback computation and the
/// amount of caller audio already forwarded, which is the timeline the AI
/// reports speech offsets on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseClock {
    pub wall: Instant,
    pub input_audio_ms: u64,
}

impl ResponseClock {
    /// Milliseconds of playback before the caller started speaking.
    ///
    /// Uses the reported `audio_start_ms` when present, otherwise the wall
    /// clock.
    pub fn elapsed_ms(&self, reported_audio_start_ms: Option<u64>, now: Instant) -> u64 {
        match reported_audio_start_ms {
            Some(reported) => reported.saturating_sub(self.input_audio_ms),
            None => duration_ms(now.saturating_duration_since(self.wall)),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Conversational turn state of one call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    /// No AI response in flight
    #[default]
    Idle,
    /// An assistant item is open and audio may be streaming
    Responding {
        item_id: String,
        started: Option<ResponseClock>,
    },
    /// Caller barged in; waiting for the AI to confirm the truncation
    Interrupting {
        item_id: String,
        /// Assistant item created while the truncation was pending
        next_item_id: Option<String>,
    },
}

impl TurnState {
    /// Whether AI audio deltas are forwarded to the caller.
    #[inline]
    pub fn passthrough_enabled(&self) -> bool {
        !matches!(self, Self::Interrupting { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Responding { .. } => "responding",
            Self::Interrupting { .. } => "interrupting",
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Responding { item_id, .. } => write!(f, "Responding({item_id})"),
            Self::Interrupting { item_id, .. } => write!(f, "Interrupting({item_id})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_bounds() {
        let policy = TruncationPolicy::default();
        assert_eq!(policy.clamp(0), 500);
        assert_eq!(policy.clamp(300), 500);
        assert_eq!(policy.clamp(2000), 2000);
        assert_eq!(policy.clamp(7000), 5000);
    }

    #[test]
    fn test_clamp_inverted_policy() {
        let policy = TruncationPolicy {
            min_ms: 800,
            max_ms: 400,
            fallback_ms: 600,
        };
        assert_eq!(policy.clamp(100), 400);
    }

    #[test]
    fn test_elapsed_prefers_reported_offset() {
        let wall = Instant::now();
        let clock = ResponseClock {
            wall,
            input_audio_ms: 4_000,
        };
        assert_eq!(clock.elapsed_ms(Some(6_500), wall), 2_500);
        // Reported offset before the response started
        assert_eq!(clock.elapsed_ms(Some(3_000), wall), 0);
    }

    #[test]
    fn test_elapsed_wall_clock() {
        let wall = Instant::now();
        let clock = ResponseClock {
            wall,
            input_audio_ms: 0,
        };
        assert_eq!(clock.elapsed_ms(None, wall + Duration::from_millis(1234)), 1234);
    }

    #[test]
    fn test_passthrough_derivation() {
        assert!(TurnState::Idle.passthrough_enabled());
        assert!(
            TurnState::Responding {
                item_id: "a".into(),
                started: None
            }
            .passthrough_enabled()
        );
        assert!(
            !TurnState::Interrupting {
                item_id: "a".into(),
                next_item_id: None
            }
            .passthrough_enabled()
        );
    }

    #[test]
    fn test_policy_partial_yaml_uses_defaults() {
        let policy: TruncationPolicy = serde_yaml::from_str("max_ms: 3000").unwrap();
        assert_eq!(policy.min_ms, 500);
        assert_eq!(policy.max_ms, 3000);
        assert_eq!(policy.fallback_ms, 1500);
    }
}
