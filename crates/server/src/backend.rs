//! Model backend selected by configuration.

use crate::config::{Config, ConfigError, Provider};
use runtime::{AnthropicBackend, Backend, ModelError, ModelOutput, ModelRequest, OpenAiBackend};

/// The configured provider's backend.
pub enum ModelBackend {
    OpenAi(OpenAiBackend),
    Anthropic(AnthropicBackend),
}

impl ModelBackend {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let model = &config.model;
        let api_key = config.api_key()?;

        let backend = match model.provider {
            Provider::OpenAi => {
                let mut builder =
                    OpenAiBackend::builder(api_key, &model.name).temperature(model.temperature);
                if let Some(max_tokens) = model.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                if let Some(base_url) = &model.base_url {
                    builder = builder.base_url(base_url);
                }
                Self::OpenAi(builder.build())
            }
            Provider::Anthropic => {
                let mut builder =
                    AnthropicBackend::builder(api_key, &model.name).temperature(model.temperature);
                if let Some(max_tokens) = model.max_tokens {
                    builder = builder.max_tokens(max_tokens);
                }
                if let Some(base_url) = &model.base_url {
                    builder = builder.base_url(base_url);
                }
                Self::Anthropic(builder.build())
            }
        };
        Ok(backend)
    }
}

impl std::fmt::Display for ModelBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi(backend) => write!(f, "{backend}"),
            Self::Anthropic(backend) => write!(f, "{backend}"),
        }
    }
}

impl Backend for ModelBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelOutput, ModelError> {
        match self {
            Self::OpenAi(backend) => backend.call(request).await,
            Self::Anthropic(backend) => backend.call(request).await,
        }
    }
}
