//! Provider factory - creates the backend for the configured provider

use super::clients::{GeminiClient, OllamaClient, OpenAIClient};
use super::traits::ModelProvider;
use super::types::ModelError;
use crate::config::{ModelProviderConfig, ProviderBackend};
use std::env;
use std::time::Duration;
use tracing::{info, warn};

/// Resolve API key from environment variable
pub fn resolve_api_key(provider: &str, spec: Option<&str>) -> Option<String> {
    let raw = spec.map(str::trim)?;
    if raw.is_empty() {
        return None;
    }
    match env::var(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(
                provider,
                env_var = raw,
                %err,
                "API key environment variable is not set"
            );
            None
        }
    }
}

/// Factory for creating model backends from provider config.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates the model backend matching [`ModelProviderConfig::backend`].
    pub fn create(
        config: &ModelProviderConfig,
        timeout: Duration,
    ) -> Result<Box<dyn ModelProvider>, ModelError> {
        info!(
            provider = config.id.as_str(),
            kind = config.provider_type.as_str(),
            "Creating model backend"
        );
        let provider: Box<dyn ModelProvider> = match config.backend() {
            ProviderBackend::Ollama => Box::new(OllamaClient::from_config(config, timeout)?),
            ProviderBackend::Gemini => Box::new(GeminiClient::from_config(config, timeout)?),
            ProviderBackend::OpenAi => Box::new(OpenAIClient::from_config(config, timeout)?),
        };
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(kind: &str) -> ModelProviderConfig {
        ModelProviderConfig {
            id: format!("{kind}-test"),
            provider_type: kind.to_string(),
            endpoint: "http://localhost:9".into(),
            api_key: None,
            api_path: None,
        }
    }

    #[test]
    fn creates_backend_for_each_type() {
        for kind in ["gemini", "openai", "ollama", "Google"] {
            let backend = ProviderFactory::create(&provider(kind), Duration::from_secs(5)).unwrap();
            assert_eq!(backend.id(), format!("{kind}-test"));
        }
    }

    #[test]
    fn provider_types_map_to_backends() {
        let cases = [
            ("gemini", ProviderBackend::Gemini),
            ("Google", ProviderBackend::Gemini),
            ("google-ai", ProviderBackend::Gemini),
            ("ollama", ProviderBackend::Ollama),
            ("localai", ProviderBackend::Ollama),
            ("openai", ProviderBackend::OpenAi),
            ("groq", ProviderBackend::OpenAi),
            ("", ProviderBackend::OpenAi),
        ];
        for (kind, expected) in cases {
            assert_eq!(provider(kind).backend(), expected, "type {kind:?}");
        }
    }

    #[test]
    fn unset_or_blank_key_resolves_to_none() {
        assert_eq!(resolve_api_key("p", None), None);
        assert_eq!(resolve_api_key("p", Some("   ")), None);
        assert_eq!(
            resolve_api_key("p", Some("MCP_TOOLBRIDGE_TEST_KEY_THAT_IS_NEVER_SET")),
            None
        );
    }
}
