//! MCP (Model Context Protocol) tool-provider connections.
//!
//! This crate owns the lifecycle of a tool provider running as a child
//! process: spawn, initialize handshake, tool listing and invocation, and
//! shutdown. Framing and transport come from the `rmcp` SDK.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Server, ServerConfig};
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = ServerConfig::from_script("weather.py")?;
//! let server = Server::connect(config).await?;
//!
//! for tool in server.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let args = serde_json::json!({ "state": "NY" });
//! let result = server
//!     .call_tool("get_alerts", args.as_object().cloned())
//!     .await?;
//! println!("is_error: {:?}", result.is_error);
//!
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod server;

pub use error::{Error, Result};
pub use rmcp::model::{CallToolResult, Content, RawContent, Tool};
pub use server::{Server, ServerConfig};
