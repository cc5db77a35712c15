//! Stand-ins for the realtime AI provider.
//!
//! - [`ScriptedConnector`] hands each new link's remote end to the test
//! - [`websocket_mock`] is a local WebSocket server speaking the OpenAI
//!   Realtime handshake

#![allow(dead_code)]

pub mod websocket_mock;

use async_trait::async_trait;
use tokio::sync::mpsc;

use callbridge_gateway::core::realtime::{
    RealtimeConnector, RealtimeLink, RealtimeLinkRemote, RealtimeResult,
};

/// Connector whose AI side is driven by the test.
pub struct ScriptedConnector {
    remotes: mpsc::UnboundedSender<RealtimeLinkRemote>,
}

impl ScriptedConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RealtimeLinkRemote>) {
        let (remotes, rx) = mpsc::unbounded_channel();
        (Self { remotes }, rx)
    }
}

#[async_trait]
impl RealtimeConnector for ScriptedConnector {
    async fn connect(&self) -> RealtimeResult<RealtimeLink> {
        let (link, remote) = RealtimeLink::channel(64);
        let _ = self.remotes.send(remote);
        Ok(link)
    }

    fn provider(&self) -> &'static str {
        "scripted"
    }
}
