//! Tool provider trait.

use crate::model::{ToolDescriptor, ToolInvocationResult};
use crate::tools::ToolError;
use serde_json::{Map, Value};
use std::future::Future;

/// A connected source of tools.
///
/// This is the boundary between the conversation loop and side effects.
/// A provider is usable from connection until [`ToolProvider::close`]
/// consumes it.
pub trait ToolProvider: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// List the tools this provider exposes.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolDescriptor>, ToolError>> + Send;

    /// Invoke a tool.
    ///
    /// Returns `Err` when the call itself failed; a tool that ran and
    /// reported failure comes back as `Ok` with `is_error` set.
    fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> impl Future<Output = Result<ToolInvocationResult, ToolError>> + Send;

    /// Release the connection.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}
