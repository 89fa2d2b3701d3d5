//! MCP-backed tool provider.

use std::time::Duration;

use mcp::{CallToolResult, RawContent, Server, ServerConfig, Tool};
use serde_json::{Map, Value};

use super::{ToolError, ToolProvider};
use crate::model::{Content, ToolDescriptor, ToolInvocationResult};
use crate::{Error, Result};

/// Spawn an MCP server and complete its handshake within `timeout`.
pub async fn spawn_mcp(config: ServerConfig, timeout: Duration) -> Result<Server> {
    let name = config.name.clone();
    tokio::time::timeout(timeout, Server::connect(config))
        .await
        .map_err(|_| {
            Error::ProviderUnavailable(format!("{name}: no handshake within {timeout:?}"))
        })?
        .map_err(|e| Error::ProviderUnavailable(format!("{name}: {e}")))
}

impl ToolProvider for Server {
    fn name(&self) -> &str {
        Server::name(self)
    }

    async fn list_tools(&self) -> std::result::Result<Vec<ToolDescriptor>, ToolError> {
        let tools = Server::list_tools(self)
            .await
            .map_err(|e| ToolError::Invocation(e.to_string()))?;
        Ok(tools.into_iter().map(descriptor_from_tool).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> std::result::Result<ToolInvocationResult, ToolError> {
        let result = Server::call_tool(self, name, arguments)
            .await
            .map_err(|e| ToolError::Invocation(e.to_string()))?;
        Ok(result_from_mcp(result))
    }

    async fn close(self) {
        self.shutdown().await;
    }
}

fn descriptor_from_tool(tool: Tool) -> ToolDescriptor {
    ToolDescriptor {
        name: tool.name.into_owned(),
        description: tool.description.map(|d| d.into_owned()).unwrap_or_default(),
        input_schema: Value::Object((*tool.input_schema).clone()),
    }
}

/// Fold an MCP result into a single payload.
///
/// Text blocks are joined with newlines; structured content is used only
/// when the tool produced no text.
fn result_from_mcp(result: CallToolResult) -> ToolInvocationResult {
    let text = result
        .content
        .iter()
        .filter_map(|c| match &c.raw {
            RawContent::Text(t) => Some(t.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    let content = match result.structured_content {
        Some(value) if text.is_empty() => Content::Structured(value),
        _ => Content::Text(text),
    };

    ToolInvocationResult {
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}
