//! In-memory stand-ins for a model backend and a tool provider.
//!
//! Enabled for this crate's tests and, through the `testing` feature, for
//! downstream crates' tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::model::{
    Backend, Completion, Content, Message, ModelError, ModelRequest, ModelResponse,
    ToolDescriptor, ToolInvocationRequest, ToolInvocationResult,
};
use crate::tools::{ToolError, ToolProvider};

/// What a [`ScriptedBackend`] was asked.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// A backend that replays queued responses in order.
///
/// Once the script runs out, every call fails with `ModelError::Api`.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a final answer.
    pub fn answer(self, text: impl Into<String>) -> Self {
        self.push(Ok(ModelResponse::FinalAnswer { text: text.into() }))
    }

    /// Queue a tool request, optionally with accompanying text.
    pub fn tool_use(self, tool: &str, arguments: Value, text: Option<&str>) -> Self {
        self.push(Ok(ModelResponse::ToolUse {
            request: ToolInvocationRequest {
                tool_name: tool.to_string(),
                arguments,
            },
            text: text.map(str::to_string),
        }))
    }

    /// Queue a failed call.
    pub fn failure(self, message: impl Into<String>) -> Self {
        self.push(Err(ModelError::Network(message.into())))
    }

    fn push(self, response: Result<ModelResponse, ModelError>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(response);
        }
        self
    }

    /// Shared log of every request received.
    pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl Backend for ScriptedBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<Completion, ModelError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages: request.messages.to_vec(),
                tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            });
        }

        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());

        match next {
            Some(response) => response.map(Completion::new),
            None => Err(ModelError::Api("script exhausted".to_string())),
        }
    }
}

/// A tool provider serving canned results.
pub struct StaticProvider {
    name: String,
    tools: Vec<(ToolDescriptor, ToolInvocationResult)>,
    reachable: bool,
    list_delay: Option<Duration>,
    call_delay: Option<Duration>,
    call_failure: Option<String>,
    calls: Arc<AtomicUsize>,
    arguments: Arc<Mutex<Vec<Option<Map<String, Value>>>>>,
    closed: Arc<AtomicUsize>,
}

impl StaticProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
            reachable: true,
            list_delay: None,
            call_delay: None,
            call_failure: None,
            calls: Arc::default(),
            arguments: Arc::default(),
            closed: Arc::default(),
        }
    }

    /// Serve a tool that returns `content`.
    pub fn with_tool(self, name: &str, content: Content) -> Self {
        self.with_result(name, ToolInvocationResult::success(content))
    }

    /// Serve a tool that runs but reports failure.
    pub fn with_failing_tool(self, name: &str, message: &str) -> Self {
        self.with_result(name, ToolInvocationResult::error(message))
    }

    fn with_result(mut self, name: &str, result: ToolInvocationResult) -> Self {
        let descriptor = ToolDescriptor {
            name: name.to_string(),
            description: format!("{name} (test tool)"),
            input_schema: json!({"type": "object"}),
        };
        self.tools.push((descriptor, result));
        self
    }

    /// Fail discovery.
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Delay discovery.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Delay every tool call.
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Make every tool call fail at the transport level.
    pub fn failing_calls(mut self, message: &str) -> Self {
        self.call_failure = Some(message.to_string());
        self
    }

    /// Counter of tool calls that reached this provider.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Arguments of every call that reached this provider.
    pub fn arguments(&self) -> Arc<Mutex<Vec<Option<Map<String, Value>>>>> {
        Arc::clone(&self.arguments)
    }

    /// Counter of `close` calls.
    pub fn closed(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closed)
    }
}

impl ToolProvider for StaticProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.reachable {
            return Err(ToolError::Invocation(format!("{} is down", self.name)));
        }
        Ok(self.tools.iter().map(|(d, _)| d.clone()).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<ToolInvocationResult, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.arguments.lock() {
            seen.push(arguments);
        }
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.call_failure {
            return Err(ToolError::Invocation(message.clone()));
        }
        self.tools
            .iter()
            .find(|(d, _)| d.name == name)
            .map(|(_, result)| result.clone())
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    async fn close(self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}
