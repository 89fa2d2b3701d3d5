//! MCP server management (spawn, handshake, lifecycle).

use std::collections::HashMap;
use std::path::Path;

use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult, Tool},
    service::{RoleClient, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Configuration for an MCP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

impl ServerConfig {
    /// Derive a launch configuration from a server script path.
    ///
    /// Python scripts run under `python`, JavaScript under `node`.
    pub fn from_script(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let command = match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => "python",
            Some("js") => "node",
            _ => return Err(Error::InvalidTarget(display)),
        };

        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(command)
            .to_string();

        Ok(Self {
            name,
            command: command.to_string(),
            args: vec![display],
            env: HashMap::new(),
        })
    }

    /// Replace the interpreter used to launch the server.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }
}

/// Handle to a running, initialized MCP server.
///
/// The child process is killed when the handle is dropped or shut down.
pub struct Server {
    config: ServerConfig,
    service: RunningService<RoleClient, ()>,
}

impl Server {
    /// Spawn the server process and perform the initialize handshake.
    pub async fn connect(config: ServerConfig) -> Result<Self> {
        debug!(server = %config.name, command = %config.command, args = ?config.args, "spawning MCP server");

        let transport = TokioChildProcess::new(Command::new(&config.command).configure(|cmd| {
            cmd.args(&config.args).envs(&config.env).kill_on_drop(true);
        }))?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Error::Handshake(e.to_string()))?;

        if let Some(info) = service.peer_info() {
            info!(
                server = %config.name,
                remote = %info.server_info.name,
                version = %info.server_info.version,
                "connected to MCP server"
            );
        }

        Ok(Self { config, service })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// List every tool the server exposes, following pagination.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let tools = self.service.list_all_tools().await?;
        debug!(server = %self.config.name, count = tools.len(), "listed tools");
        Ok(tools)
    }

    /// Call a tool by name.
    ///
    /// A tool that runs and reports failure still returns `Ok`; check
    /// `is_error` on the result.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult> {
        let params = CallToolRequestParams {
            name: name.to_string().into(),
            arguments,
            meta: None,
            task: None,
        };

        let result = self.service.call_tool(params).await?;
        Ok(result)
    }

    /// Shut the server down, terminating the child process.
    pub async fn shutdown(self) {
        let name = self.config.name;
        match self.service.cancel().await {
            Ok(reason) => info!(server = %name, ?reason, "MCP server shut down"),
            Err(e) => warn!(server = %name, error = %e, "MCP service task failed during shutdown"),
        }
    }
}
