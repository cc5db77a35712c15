//! HTTP and WebSocket request handlers
//!
//! - `api` - service info and health probes
//! - `calls` - Vonage answer/event webhooks and outbound calls
//! - `media_stream` - caller media WebSocket bridged to the realtime AI

pub mod api;
pub mod calls;
pub mod media_stream;

pub use media_stream::media_stream_handler;
