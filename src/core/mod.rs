pub mod audio;
pub mod realtime;
pub mod relay;
pub mod tools;
pub mod turn;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioResult, DeliveryPolicy, PcmFormat, ResampleAlgorithm, Resampler};

pub use realtime::{
    ConnectionState, OpenAIRealtime, RealtimeConfig, RealtimeConnector, RealtimeError,
    RealtimeLink, RealtimeResult,
};

pub use relay::{CallerInbound, CallerLink, CallerOutbound, RelayConfig, RelayError, SessionRelay};

pub use tools::{ToolError, ToolHandler, ToolRegistry, WeatherConfig, WeatherTool};

pub use turn::{TruncationPolicy, TurnCommand, TurnController, TurnState};
