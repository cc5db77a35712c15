use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::ServerConfig;
use crate::core::realtime::openai::SessionConfig;
use crate::core::realtime::{OpenAIRealtime, RealtimeConnector};
use crate::core::tools::{ToolRegistry, WeatherTool};
use crate::vonage::VonageClient;

/// Timeout for outbound HTTP calls (Voice API, weather lookups).
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state handed to every route.
pub struct AppState {
    pub config: ServerConfig,
    pub tools: Arc<ToolRegistry>,
    /// Opens one realtime AI connection per call
    pub connector: Arc<dyn RealtimeConnector>,
    /// Sent as `session.update` once the AI link opens
    pub session: SessionConfig,
    pub vonage: VonageClient,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("tools", &self.tools)
            .field("provider", &self.connector.provider())
            .field("vonage", &self.vonage)
            .finish()
    }
}

impl AppState {
    /// State backed by the OpenAI Realtime API.
    pub fn new(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let openai = OpenAIRealtime::new(config.realtime_config())
            .context("Invalid OpenAI Realtime configuration")?;
        Self::with_connector(config, Arc::new(openai))
    }

    /// State with a caller-supplied realtime connector.
    pub fn with_connector(
        config: ServerConfig,
        connector: Arc<dyn RealtimeConnector>,
    ) -> anyhow::Result<Arc<Self>> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        let tools = Arc::new(ToolRegistry::with_defaults(WeatherTool::new(
            http.clone(),
            config.weather.clone(),
        )));
        let session = OpenAIRealtime::new(config.realtime_config())
            .context("Invalid OpenAI Realtime configuration")?
            .session_config(tools.definitions());
        let vonage = VonageClient::new(http, &config.vonage);

        tracing::info!(
            provider = connector.provider(),
            tools = ?tools,
            vonage_configured = vonage.is_configured(),
            "Application state initialized"
        );

        Ok(Arc::new(Self {
            config,
            tools,
            connector,
            session,
            vonage,
        }))
    }
}
