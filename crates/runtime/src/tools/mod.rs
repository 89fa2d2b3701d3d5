//! Tool providers, discovery, and invocation routing.

pub mod errors;
mod mcp_host;
mod provider;
mod registry;
mod types;

pub use errors::ToolError;
pub use mcp_host::spawn_mcp;
pub use provider::ToolProvider;
pub use registry::{DEFAULT_TIMEOUT, ToolRegistry};
pub use types::{RegisteredTool, ToolArguments};
