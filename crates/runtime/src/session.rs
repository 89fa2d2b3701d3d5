//! Session management and the tool-mediated conversation loop.

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::conversation::ConversationState;
use crate::model::{
    Backend, Message, ModelConfig, ModelRequest, ModelResponse, ToolDescriptor,
    ToolInvocationRequest, ToolInvocationResult,
};
use crate::tools::{ToolProvider, ToolRegistry};
use crate::Result;

/// A tool call made during a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub request: ToolInvocationRequest,
    pub is_error: bool,
}

/// The outcome of one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    /// Set when a tool ran during the turn.
    pub tool_call: Option<ToolCallRecord>,
}

/// A conversation session: history, tools, and a model backend.
///
/// Each [`chat`](Session::chat) call is one turn. A turn makes at most two
/// model calls and at most one tool call. Messages produced during a turn
/// are staged and only committed to the history once the turn succeeds, so
/// a failed or abandoned turn leaves the history untouched.
pub struct Session<B, P> {
    pub id: Uuid,
    backend: B,
    tools: ToolRegistry<P>,
    config: ModelConfig,
    state: ConversationState,
    history_limit: Option<usize>,
}

impl<B: Backend, P: ToolProvider> Session<B, P> {
    /// Create a session. Discover tools before the first turn.
    pub fn new(backend: B, tools: ToolRegistry<P>, config: ModelConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend,
            tools,
            config,
            state: ConversationState::new(),
            history_limit: None,
        }
    }

    /// Replay at most `limit` committed messages to the model each call.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Discover the tools the providers expose.
    pub async fn discover(&mut self) -> Result<&[ToolDescriptor]> {
        self.tools.discover().await
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        self.tools.descriptors()
    }

    pub fn history(&self) -> &ConversationState {
        &self.state
    }

    /// Run one turn: send the user input, run at most one tool, and return
    /// the model's final answer.
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn chat(&mut self, user_input: &str) -> Result<Reply> {
        let mut staged = vec![Message::user(user_input)];

        let (request, lead_text) = match self.call_model(&staged).await? {
            ModelResponse::FinalAnswer { text } => {
                staged.push(Message::assistant(text.clone()));
                self.state.commit(staged);
                return Ok(Reply {
                    text,
                    tool_call: None,
                });
            }
            ModelResponse::ToolUse { request, text } => (request, text),
        };

        if let Some(text) = lead_text.filter(|t| !t.trim().is_empty()) {
            staged.push(Message::assistant(text));
        }

        info!(tool = %request.tool_name, "model requested a tool");
        let result = match self.tools.invoke(&request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %request.tool_name, error = %e, "tool invocation failed");
                ToolInvocationResult::from(e)
            }
        };
        staged.push(Message::tool(&result));

        let text = match self.call_model(&staged).await? {
            ModelResponse::FinalAnswer { text } => text,
            ModelResponse::ToolUse {
                request: ignored,
                text,
            } => {
                warn!(
                    tool = %ignored.tool_name,
                    "one tool call per turn; not running the follow-up request"
                );
                text.unwrap_or_default()
            }
        };

        staged.push(Message::assistant(text.clone()));
        self.state.commit(staged);

        Ok(Reply {
            text,
            tool_call: Some(ToolCallRecord {
                request,
                is_error: result.is_error,
            }),
        })
    }

    /// End the session, releasing every tool provider.
    pub async fn close(self) {
        info!(session = %self.id, messages = self.state.len(), "session ended");
        self.tools.close().await;
    }

    async fn call_model(&self, staged: &[Message]) -> Result<ModelResponse> {
        let mut transcript = self.state.window(self.history_limit).to_vec();
        transcript.extend_from_slice(staged);

        let completion = self
            .backend
            .call(ModelRequest {
                messages: &transcript,
                tools: self.tools.descriptors(),
                config: &self.config,
            })
            .await?;

        debug!(
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "model call complete"
        );
        Ok(completion.response)
    }
}
