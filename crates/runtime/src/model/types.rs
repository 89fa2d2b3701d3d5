use super::errors::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// Message or tool payload: plain text or structured JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Structured(Value),
}

impl Content {
    /// Create a text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Render the payload as text for a model.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }

    /// Whether the payload carries nothing worth sending.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Structured(value) => value.is_null(),
        }
    }
}

/// A single entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Content::text(text),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::text(text),
        }
    }

    /// Create a tool-role message carrying a tool's output.
    ///
    /// Failed results are prefixed so the model sees them as errors.
    pub fn tool(result: &ToolInvocationResult) -> Self {
        let content = if result.is_error {
            Content::Text(format!("error: {}", result.content.to_text()))
        } else {
            result.content.clone()
        };
        Self {
            role: Role::Tool,
            content,
        }
    }

    /// Get the text content of this message.
    pub fn text(&self) -> String {
        self.content.to_text()
    }
}

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub tool_name: String,
    pub arguments: Value,
}

/// What a tool returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    pub content: Content,
    pub is_error: bool,
}

impl ToolInvocationResult {
    pub fn success(content: Content) -> Self {
        Self {
            content,
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: Content::text(message),
            is_error: true,
        }
    }
}

/// How the model answered a request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// The model is done; `text` is the answer.
    FinalAnswer { text: String },
    /// The model wants a tool run before it answers.
    ToolUse {
        request: ToolInvocationRequest,
        /// Text the model emitted alongside the request, if any.
        text: Option<String>,
    },
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A backend's answer to one model call.
#[derive(Debug, Clone)]
pub struct Completion {
    pub response: ModelResponse,
    pub usage: Usage,
}

impl Completion {
    pub fn new(response: ModelResponse) -> Self {
        Self {
            response,
            usage: Usage::default(),
        }
    }
}

/// Sampling parameters fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub system: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            max_output_tokens: 512,
            temperature: 0.3,
            top_p: 0.9,
            system: None,
        }
    }
}

/// Everything needed for a model request.
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolDescriptor],
    pub config: &'a ModelConfig,
}

/// Trait for LLM provider backends.
pub trait Backend: Send + Sync {
    fn call(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<Completion, ModelError>> + Send;
}
