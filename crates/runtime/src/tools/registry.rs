//! Tool discovery and routing across providers.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{RegisteredTool, ToolArguments, ToolError, ToolProvider};
use crate::model::{ToolDescriptor, ToolInvocationRequest, ToolInvocationResult};
use crate::{Error, Result};

/// Default bound on discovery and on each tool call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maps tool names to the providers that serve them.
pub struct ToolRegistry<P> {
    providers: Vec<P>,
    descriptors: Vec<ToolDescriptor>,
    tools: HashMap<String, RegisteredTool>,
    discovery_timeout: Duration,
    call_timeout: Duration,
}

impl<P: ToolProvider> ToolRegistry<P> {
    /// Create a registry over connected providers. Call [`discover`] before use.
    ///
    /// [`discover`]: ToolRegistry::discover
    pub fn new(providers: Vec<P>) -> Self {
        Self {
            providers,
            descriptors: Vec::new(),
            tools: HashMap::new(),
            discovery_timeout: DEFAULT_TIMEOUT,
            call_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Query every provider for its tools, replacing any earlier discovery.
    ///
    /// Providers that fail or time out are skipped. Fails with
    /// `ProviderUnavailable` when none answers.
    pub async fn discover(&mut self) -> Result<&[ToolDescriptor]> {
        let mut descriptors = Vec::new();
        let mut tools = HashMap::new();
        let mut reachable = 0usize;

        for (index, provider) in self.providers.iter().enumerate() {
            let listed = match tokio::time::timeout(self.discovery_timeout, provider.list_tools())
                .await
            {
                Ok(Ok(listed)) => listed,
                Ok(Err(e)) => {
                    warn!(provider = provider.name(), error = %e, "tool discovery failed");
                    continue;
                }
                Err(_) => {
                    warn!(
                        provider = provider.name(),
                        timeout = ?self.discovery_timeout,
                        "tool discovery timed out"
                    );
                    continue;
                }
            };
            reachable += 1;

            for descriptor in listed {
                if tools.contains_key(&descriptor.name) {
                    warn!(
                        provider = provider.name(),
                        tool = %descriptor.name,
                        "duplicate tool name; keeping the first provider's"
                    );
                    continue;
                }
                tools.insert(
                    descriptor.name.clone(),
                    RegisteredTool {
                        descriptor: descriptor.clone(),
                        provider: index,
                    },
                );
                descriptors.push(descriptor);
            }
        }

        if reachable == 0 {
            return Err(Error::ProviderUnavailable(format!(
                "none of {} provider(s) answered tool discovery",
                self.providers.len()
            )));
        }

        info!(
            providers = reachable,
            tools = descriptors.len(),
            "tool discovery complete"
        );
        self.descriptors = descriptors;
        self.tools = tools;
        Ok(&self.descriptors)
    }

    /// Tools found by the last discovery, in provider order.
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Route a tool call to the provider that owns the tool.
    pub async fn invoke(
        &self,
        request: &ToolInvocationRequest,
    ) -> std::result::Result<ToolInvocationResult, ToolError> {
        let registered = self
            .tools
            .get(&request.tool_name)
            .ok_or_else(|| ToolError::UnknownTool(request.tool_name.clone()))?;
        let provider = self.providers.get(registered.provider).ok_or_else(|| {
            ToolError::Invocation(format!("provider for {} is gone", request.tool_name))
        })?;
        let arguments = ToolArguments::try_from(request.arguments.clone())?;

        debug!(
            provider = provider.name(),
            tool = %request.tool_name,
            arguments = %request.arguments,
            "invoking tool"
        );

        let result = tokio::time::timeout(
            self.call_timeout,
            provider.call_tool(&request.tool_name, arguments.0),
        )
        .await
        .map_err(|_| ToolError::Timeout(millis(self.call_timeout)))??;

        debug!(tool = %request.tool_name, is_error = result.is_error, "tool returned");
        Ok(result)
    }

    /// Release every provider.
    pub async fn close(self) {
        for provider in self.providers {
            provider.close().await;
        }
    }
}

/// Whole milliseconds in `timeout`, saturating at `u64::MAX`.
fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
