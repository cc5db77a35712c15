//! Conversational turn tracking and barge-in handling.
//!
//! [`TurnController`] follows the assistant response currently in flight and
//! owns the outbound audio path (resampler and paginator). Caller speech
//! during a response moves it to [`TurnState::Interrupting`]: passthrough is
//! muted, buffered audio is dropped and the relay is told to truncate the item
//! on the AI side and clear playback on the caller side.
//!
//! ```text
//!  Idle ──item created / first delta──▶ Responding
//!   ▲                                    │      │
//!   │◀────────── response.done ──────────┘      │ speech started
//!   │                                           ▼
//!   └──── item truncated / truncate rejected ── Interrupting
//! ```
//!
//! The controller is synchronous and I/O free; it returns [`TurnCommand`]s.

mod controller;
mod state;

pub use controller::{TurnCommand, TurnController};
pub use state::{
    DEFAULT_TRUNCATE_FALLBACK_MS, DEFAULT_TRUNCATE_MAX_MS, DEFAULT_TRUNCATE_MIN_MS, ResponseClock,
    TruncationPolicy, TurnState,
};
