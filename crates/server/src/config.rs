//! Configuration loading from abacus.toml.

use serde::Deserialize;
use std::path::Path;

const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model provider configuration.
    #[serde(default)]
    pub model: ModelConfig,

    /// Loop settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which model API to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAi,
    Anthropic,
}

/// Model provider configuration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default)]
    pub temperature: f32,

    pub max_tokens: Option<u32>,

    /// API key. Falls back to the provider's environment variable.
    pub api_key: Option<String>,

    /// Override the provider's API base URL.
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            name: default_model(),
            temperature: 0.0,
            max_tokens: None,
            api_key: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Tool rounds allowed per run.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_rounds() -> usize {
    runtime::DEFAULT_MAX_ROUNDS
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve the API key for the configured provider.
    ///
    /// The file wins over the environment.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        self.api_key_with(|var| std::env::var(var).ok())
    }

    fn api_key_with(&self, env: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        let var = match self.model.provider {
            Provider::OpenAi => OPENAI_KEY_VAR,
            Provider::Anthropic => ANTHROPIC_KEY_VAR,
        };
        self.model
            .api_key
            .clone()
            .or_else(|| env(var))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey { var })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("API key not configured: set model.api_key or {var}")]
    MissingApiKey { var: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.model.provider, Provider::OpenAi);
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.model.temperature, 0.0);
        assert_eq!(config.agent.max_rounds, 10);
        assert_eq!(config.server.addr(), "0.0.0.0:8080");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse(
            r#"
            [model]
            provider = "anthropic"
            name = "claude-sonnet-4-20250514"
            max_tokens = 1024

            [agent]
            max_rounds = 4

            [server]
            port = 9000
            "#,
        )
        .unwrap();

        assert_eq!(config.model.provider, Provider::Anthropic);
        assert_eq!(config.model.max_tokens, Some(1024));
        assert_eq!(config.agent.max_rounds, 4);
        assert_eq!(config.server.addr(), "0.0.0.0:9000");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::parse("[agent]\nmax_round = 4\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn api_key_prefers_file_then_env() {
        let mut config = Config::default();
        let env = |var: &str| (var == OPENAI_KEY_VAR).then(|| "from-env".to_string());

        assert_eq!(config.api_key_with(env).unwrap(), "from-env");

        config.model.api_key = Some("from-file".into());
        assert_eq!(config.api_key_with(env).unwrap(), "from-file");
    }

    #[test]
    fn missing_api_key_names_the_variable() {
        let mut config = Config::default();
        config.model.provider = Provider::Anthropic;

        let err = config.api_key_with(|_| None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingApiKey {
                var: ANTHROPIC_KEY_VAR
            }
        ));
    }
}
