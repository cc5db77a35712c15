use async_trait::async_trait;
use serde_json::{Value, json};

use super::{ToolHandler, ToolResult, string_argument};
use crate::core::realtime::openai::ToolDef;

/// Records the caller's name in the session log.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutNameTool;

#[async_trait]
impl ToolHandler for PutNameTool {
    fn name(&self) -> &'static str {
        "put_name"
    }

    fn definition(&self) -> ToolDef {
        ToolDef::function(
            "put_name",
            "Records the caller's name once they have said it",
            json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "The caller's name"
                    }
                },
                "required": ["name"]
            }),
        )
    }

    async fn call(&self, arguments: Value) -> ToolResult<String> {
        let name = string_argument(&arguments, "name")?;
        tracing::info!(caller_name = %name, "Recorded caller name");
        Ok(format!("Recorded the caller's name: {name}"))
    }
}
