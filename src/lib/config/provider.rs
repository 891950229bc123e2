//! # Provider Configuration
//!
//! Configuration types for the model backends. Exactly one provider is
//! active per run, selected through `default_provider`.
//!
//! | Type | Description | API Key Required |
//! |------|-------------|-----------------|
//! | `gemini` | Google Gemini API | Yes |
//! | `openai` | OpenAI-compatible APIs | Yes |
//! | `ollama` | Local Ollama server | No |

use serde::{Deserialize, Serialize};

/// Request format spoken by a provider, derived from its `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBackend {
    Gemini,
    Ollama,
    /// Default for any other type.
    OpenAi,
}

/// Configuration for a model backend.
///
/// # Example
///
/// ```toml
/// [[providers]]
/// id = "gemini"
/// type = "gemini"
/// endpoint = "https://generativelanguage.googleapis.com"
/// api_key = "GEMINI_API_KEY"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelProviderConfig {
    /// Unique identifier for this provider (e.g., "gemini", "ollama-local")
    pub id: String,
    /// The provider type determines API format: "ollama", "gemini", "openai"
    #[serde(rename = "type")]
    pub provider_type: String,
    /// API endpoint URL
    pub endpoint: String,
    /// Name of the environment variable holding the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Custom API path override (e.g., "v1beta/models" for Gemini)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct RawProviderConfig {
    pub(super) id: String,
    #[serde(rename = "type", default)]
    pub(super) provider_type: String,
    pub(super) endpoint: Option<String>,
    pub(super) api_key: Option<String>,
    #[serde(default)]
    pub(super) api_path: Option<String>,
}

impl From<RawProviderConfig> for ModelProviderConfig {
    fn from(raw: RawProviderConfig) -> Self {
        Self {
            id: raw.id,
            provider_type: raw.provider_type,
            endpoint: raw.endpoint.unwrap_or_default(),
            api_key: raw.api_key,
            api_path: raw.api_path,
        }
    }
}

impl ModelProviderConfig {
    /// Classifies `provider_type` case-insensitively.
    ///
    /// ```
    /// use mcp_toolbridge::config::{ModelProviderConfig, ProviderBackend};
    ///
    /// let provider = ModelProviderConfig {
    ///     id: "local".to_string(),
    ///     provider_type: "LocalAI".to_string(),
    ///     endpoint: "http://localhost:11434".to_string(),
    ///     api_key: None,
    ///     api_path: None,
    /// };
    /// assert_eq!(provider.backend(), ProviderBackend::Ollama);
    /// ```
    pub fn backend(&self) -> ProviderBackend {
        match self.provider_type.to_ascii_lowercase().as_str() {
            "ollama" | "localai" => ProviderBackend::Ollama,
            "gemini" | "google" | "google-ai" => ProviderBackend::Gemini,
            _ => ProviderBackend::OpenAi,
        }
    }
}
