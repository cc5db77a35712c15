//! Realtime speech AI transport.
//!
//! [`RealtimeConnector`] opens one [`RealtimeLink`] per call. The OpenAI
//! Realtime API is the only provider.

mod base;
pub mod openai;

pub use base::{
    ConnectionState, RealtimeConfig, RealtimeConnector, RealtimeError, RealtimeInbound,
    RealtimeLink, RealtimeLinkRemote, RealtimeResult,
};
pub use openai::{
    ClientEvent, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, OpenAIRealtime, ServerEvent,
};
