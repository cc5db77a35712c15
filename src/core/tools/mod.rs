//! Function tools the AI may call during a conversation.
//!
//! Tools are registered once at startup in a [`ToolRegistry`] shared by every
//! call. Their schemas are advertised in `session.update`, and the relay
//! invokes them on `response.function_call_arguments.done`.
//!
//! A tool never fails across the relay boundary: any [`ToolError`] becomes a
//! sentence returned to the model as the function output.

mod put_name;
mod weather;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::realtime::openai::ToolDef;

pub use put_name::PutNameTool;
pub use weather::{
    DEFAULT_OPEN_WEATHER_URL, WeatherConfig, WeatherReport, WeatherTool,
};

/// Errors raised while running a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Required setting such as an API key is absent
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Upstream has no data for the requested subject
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// A callable tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &'static str;

    /// Schema advertised to the model.
    fn definition(&self) -> ToolDef;

    /// Run the tool with parsed JSON arguments and return the text output.
    async fn call(&self, arguments: Value) -> ToolResult<String>;
}

/// Tools available to every call.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn ToolHandler>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in tools.
    pub fn with_defaults(weather: WeatherTool) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(weather));
        registry.register(Arc::new(PutNameTool));
        registry
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name();
        if self.handlers.insert(name, handler).is_some() {
            tracing::warn!(tool = name, "Replacing already registered tool");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Schemas of every tool, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDef> {
        self.handlers.values().map(|h| h.definition()).collect()
    }

    /// Run `name` with the raw JSON `arguments` sent by the model.
    pub async fn invoke(&self, name: &str, arguments: &str) -> ToolResult<String> {
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let arguments: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?
        };

        handler.call(arguments).await
    }

    /// Like [`ToolRegistry::invoke`], but failures become the output text.
    pub async fn invoke_soft(&self, name: &str, arguments: &str) -> String {
        match self.invoke(name, arguments).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                failure_output(name)
            }
        }
    }
}

/// Output sent to the model when a tool could not run.
pub fn failure_output(name: &str) -> String {
    format!("An error occurred while running {name}. Please tell the caller it is unavailable.")
}

/// Read a required string argument.
pub(crate) fn string_argument<'a>(arguments: &'a Value, key: &str) -> ToolResult<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string field '{key}'")))
}
