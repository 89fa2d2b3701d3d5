//! Relay runtime: a conversation loop between an LLM and MCP tools.
//!
//! # Overview
//!
//! - **Session**: owns the conversation history and runs turns. A turn sends
//!   the history to the model; if the model asks for a tool, the session
//!   runs it through the registry and asks the model once more.
//! - **Backend**: a trait abstracting LLM providers (Anthropic, etc.).
//! - **ToolRegistry**: discovers tools from one or more [`ToolProvider`]s and
//!   routes calls by tool name.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use mcp::ServerConfig;
//! use runtime::{AnthropicBackend, ModelConfig, Session, ToolRegistry, spawn_mcp};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = AnthropicBackend::builder("sk-ant-api03-...").build()?;
//! let config = ServerConfig::from_script("weather.py")?;
//! let server = spawn_mcp(config, Duration::from_secs(15)).await?;
//!
//! let mut session = Session::new(backend, ToolRegistry::new(vec![server]), ModelConfig::default());
//! session.discover().await?;
//! let reply = session.chat("What's the weather in NY?").await?;
//! println!("{}", reply.text);
//! session.close().await;
//! # Ok(())
//! # }
//! ```

mod conversation;
mod error;
pub mod model;
pub mod providers;
mod session;
pub mod tools;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use conversation::ConversationState;
pub use error::{Error, Result};
pub use model::{
    Backend, Completion, Content, Message, ModelConfig, ModelError, ModelRequest, ModelResponse,
    Role, ToolDescriptor, ToolInvocationRequest, ToolInvocationResult, Usage,
};
pub use providers::AnthropicBackend;
pub use session::{Reply, Session, ToolCallRecord};
pub use tools::{ToolError, ToolProvider, ToolRegistry, spawn_mcp};
