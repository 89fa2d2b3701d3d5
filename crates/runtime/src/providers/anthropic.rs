//! Anthropic API backend.

use std::time::Duration;

use crate::model::{
    Backend, Completion, Message, ModelError, ModelRequest, ModelResponse, Role, ToolDescriptor,
    ToolInvocationRequest, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ApiMessage {
    role: &'static str,
    content: Vec<ApiContentBlock>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        #[allow(dead_code)]
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl AnthropicBackendBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the Messages endpoint (proxies, gateways).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Bound each HTTP request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<AnthropicBackend, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(AnthropicBackend {
            client,
            api_key: self.api_key,
            base_url: self.base_url,
        })
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicBackend {
    pub fn builder(api_key: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(api_key)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User | Role::Tool => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Convert history to API messages.
    ///
    /// Tool output goes back as user text, so adjacent messages can share a
    /// wire role; those are merged into one message with several blocks.
    /// Blank messages are dropped since the API rejects empty text.
    fn messages_to_api(messages: &[Message]) -> Vec<ApiMessage> {
        let mut out: Vec<ApiMessage> = Vec::with_capacity(messages.len());

        for msg in messages.iter().filter(|m| !m.content.is_blank()) {
            let role = Self::role_to_api(msg.role);
            let block = ApiContentBlock::Text { text: msg.text() };

            match out.last_mut() {
                Some(last) if last.role == role => last.content.push(block),
                _ => out.push(ApiMessage {
                    role,
                    content: vec![block],
                }),
            }
        }

        out
    }

    fn tool_to_api(tool: &ToolDescriptor) -> ApiTool<'_> {
        ApiTool {
            name: &tool.name,
            description: &tool.description,
            input_schema: &tool.input_schema,
        }
    }

    fn response_from_blocks(blocks: Vec<ApiResponseBlock>) -> ModelResponse {
        let mut text = String::new();
        let mut request = None;
        let mut dropped = 0usize;

        for block in blocks {
            match block {
                ApiResponseBlock::Text { text: t } => text.push_str(&t),
                ApiResponseBlock::ToolUse { name, input, .. } => {
                    if request.is_none() {
                        request = Some(ToolInvocationRequest {
                            tool_name: name,
                            arguments: input,
                        });
                    } else {
                        dropped += 1;
                    }
                }
                ApiResponseBlock::Unknown => {}
            }
        }

        if dropped > 0 {
            debug!(dropped, "model requested several tools; keeping the first");
        }

        match request {
            Some(request) => ModelResponse::ToolUse {
                request,
                text: (!text.trim().is_empty()).then_some(text),
            },
            None => ModelResponse::FinalAnswer { text },
        }
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({})", self.base_url)
    }
}

impl Backend for AnthropicBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<Completion, ModelError> {
        let config = request.config;
        let api_request = ApiRequest {
            model: &config.model,
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            messages: Self::messages_to_api(request.messages),
            system: config.system.as_deref(),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    debug!(%status, error = %e, "failed to read error body");
                    String::new()
                }
            };
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    transport_error(e)
                } else {
                    ModelError::InvalidResponse(e.to_string())
                }
            })?;

        debug!(stop_reason = ?api_response.stop_reason, "model call finished");

        Ok(Completion {
            response: Self::response_from_blocks(api_response.content),
            usage: Usage {
                input_tokens: api_response.usage.input_tokens,
                output_tokens: api_response.usage.output_tokens,
            },
        })
    }
}

fn transport_error(err: reqwest::Error) -> ModelError {
    if err.is_timeout() {
        ModelError::Timeout(err.to_string())
    } else {
        ModelError::Network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Content, ToolInvocationResult};
    use serde_json::json;

    fn text_block(text: &str) -> ApiContentBlock {
        ApiContentBlock::Text {
            text: text.to_string(),
        }
    }

    #[test]
    fn tool_output_merges_into_user_turn() {
        let history = vec![
            Message::user("What's the weather in NY?"),
            Message::tool(&ToolInvocationResult::success(Content::text("Sunny, 72F"))),
        ];
        let api = AnthropicBackend::messages_to_api(&history);
        assert_eq!(
            api,
            vec![ApiMessage {
                role: "user",
                content: vec![text_block("What's the weather in NY?"), text_block("Sunny, 72F")],
            }]
        );
    }

    #[test]
    fn blank_messages_are_skipped() {
        let history = vec![
            Message::user("hi"),
            Message::assistant(""),
            Message::user("still there?"),
            Message::assistant("yes"),
        ];
        let api = AnthropicBackend::messages_to_api(&history);
        assert_eq!(api.len(), 2);
        assert_eq!(api[0].content.len(), 2);
        assert_eq!(api[1].role, "assistant");
    }

    #[test]
    fn response_with_tool_use_becomes_request() {
        let body = json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_1", "name": "get_alerts", "input": {"state": "NY"}},
                {"type": "tool_use", "id": "toolu_2", "name": "get_forecast", "input": {}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        let api: ApiResponse = serde_json::from_value(body).unwrap();
        let response = AnthropicBackend::response_from_blocks(api.content);

        assert_eq!(
            response,
            ModelResponse::ToolUse {
                request: ToolInvocationRequest {
                    tool_name: "get_alerts".into(),
                    arguments: json!({"state": "NY"}),
                },
                text: Some("Let me check.".into()),
            }
        );
    }

    #[test]
    fn response_without_tool_use_is_final() {
        let body = json!({
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "there"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 3, "output_tokens": 2}
        });
        let api: ApiResponse = serde_json::from_value(body).unwrap();
        let response = AnthropicBackend::response_from_blocks(api.content);
        assert_eq!(
            response,
            ModelResponse::FinalAnswer {
                text: "Hello there".into()
            }
        );
    }

    #[test]
    fn blank_accompanying_text_is_dropped() {
        let blocks = vec![
            ApiResponseBlock::Text { text: "\n".into() },
            ApiResponseBlock::ToolUse {
                id: "toolu_1".into(),
                name: "search_external_info".into(),
                input: json!({"query": "rust"}),
            },
        ];
        match AnthropicBackend::response_from_blocks(blocks) {
            ModelResponse::ToolUse { text, .. } => assert!(text.is_none()),
            other => panic!("expected tool use, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreadable_error_body_still_reports_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 16 * 1024];
            let _ = socket.read(&mut buf).await;
            // Promise more body than is sent, then hang up.
            socket
                .write_all(
                    b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial",
                )
                .await
                .unwrap();
        });

        let backend = AnthropicBackend::builder("test-key")
            .base_url(format!("http://{addr}/v1/messages"))
            .build()
            .unwrap();
        let config = crate::model::ModelConfig::default();
        let messages = [Message::user("hi")];
        let err = backend
            .call(ModelRequest {
                messages: &messages,
                tools: &[],
                config: &config,
            })
            .await
            .unwrap_err();

        match err {
            ModelError::Api(message) => {
                assert_eq!(message, "500 Internal Server Error: ");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn request_serializes_sampling_config() {
        let config = crate::model::ModelConfig::default();
        let tools = vec![ToolDescriptor {
            name: "get_alerts".into(),
            description: "Get weather alerts for a US state.".into(),
            input_schema: json!({"type": "object"}),
        }];
        let request = ApiRequest {
            model: &config.model,
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            messages: AnthropicBackend::messages_to_api(&[Message::user("hi")]),
            system: None,
            tools: tools.iter().map(AnthropicBackend::tool_to_api).collect(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["max_tokens"], 512);
        assert_eq!(value["tools"][0]["name"], "get_alerts");
        assert_eq!(value["messages"][0]["content"][0]["type"], "text");
        assert!(value.get("system").is_none());
    }
}
