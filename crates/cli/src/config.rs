//! Configuration loading from relay.toml.

use runtime::ModelConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Environment variable consulted when `backend.api_key` is unset.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Model backend configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,

    /// Anthropic API key. Falls back to `ANTHROPIC_API_KEY`.
    pub api_key: Option<String>,

    /// Messages endpoint override.
    pub base_url: Option<String>,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    pub system_prompt: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
            timeout_secs: default_request_timeout(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            system_prompt: None,
        }
    }
}

/// Tool provider timeouts.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    #[serde(default = "default_tool_timeout")]
    pub discovery_timeout_secs: u64,

    #[serde(default = "default_tool_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_secs: default_tool_timeout(),
            call_timeout_secs: default_tool_timeout(),
        }
    }
}

/// Conversation settings.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Replay at most this many past messages to the model.
    pub history_limit: Option<usize>,
}

fn default_model() -> String {
    ModelConfig::default().model
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_output_tokens() -> u32 {
    ModelConfig::default().max_output_tokens
}

fn default_temperature() -> f32 {
    ModelConfig::default().temperature
}

fn default_top_p() -> f32 {
    ModelConfig::default().top_p
}

fn default_tool_timeout() -> u64 {
    runtime::tools::DEFAULT_TIMEOUT.as_secs()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Sampling parameters for the session.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model: self.backend.model.clone(),
            max_output_tokens: self.backend.max_output_tokens,
            temperature: self.backend.temperature,
            top_p: self.backend.top_p,
            system: self.backend.system_prompt.clone(),
        }
    }

    /// Resolve the API key from config, then from `env_key`.
    pub fn api_key(&self, env_key: Option<String>) -> Result<String, ConfigError> {
        self.backend
            .api_key
            .clone()
            .or(env_key)
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.discovery_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.call_timeout_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("API key not configured: set backend.api_key or ANTHROPIC_API_KEY")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.model_config(), ModelConfig::default());
        assert_eq!(config.discovery_timeout(), runtime::tools::DEFAULT_TIMEOUT);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert!(config.session.history_limit.is_none());
    }

    #[test]
    fn parses_all_sections() {
        let config = Config::parse(
            r#"
            [backend]
            model = "claude-3-5-haiku-latest"
            max_output_tokens = 1024
            temperature = 0.0
            top_p = 1.0
            system_prompt = "Utilize the provided tools when required."

            [tools]
            discovery_timeout_secs = 5
            call_timeout_secs = 30

            [session]
            history_limit = 8
            "#,
        )
        .unwrap();

        let model = config.model_config();
        assert_eq!(model.model, "claude-3-5-haiku-latest");
        assert_eq!(model.max_output_tokens, 1024);
        assert_eq!(model.temperature, 0.0);
        assert_eq!(
            model.system.as_deref(),
            Some("Utilize the provided tools when required.")
        );
        assert_eq!(config.discovery_timeout(), Duration::from_secs(5));
        assert_eq!(config.call_timeout(), Duration::from_secs(30));
        assert_eq!(config.session.history_limit, Some(8));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse("[backend]\nmodle = \"typo\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn api_key_prefers_config_over_env() {
        let config = Config::parse("[backend]\napi_key = \"from-file\"\n").unwrap();
        assert_eq!(config.api_key(Some("from-env".into())).unwrap(), "from-file");

        let config = Config::default();
        assert_eq!(config.api_key(Some("from-env".into())).unwrap(), "from-env");
        assert!(matches!(
            config.api_key(Some("  ".into())),
            Err(ConfigError::MissingApiKey)
        ));
        assert!(matches!(config.api_key(None), Err(ConfigError::MissingApiKey)));
    }
}
