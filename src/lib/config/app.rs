use super::error::ConfigError;
use super::provider::ModelProviderConfig;
use super::server::ServerConfig;
use std::path::Path;
use std::time::Duration;

/// Application configuration loaded from client.toml
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_provider: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub servers: Vec<ServerConfig>,
    pub providers: Vec<ModelProviderConfig>,
    /// Upper bound on tool round-trips within one query.
    pub max_tool_turns: usize,
    pub tool_timeout: Duration,
    pub model_timeout: Duration,
    /// Input line that ends the interactive session.
    pub quit_command: String,
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    /// Provider entry selected by `default_provider`.
    pub fn active_provider(&self) -> Result<&ModelProviderConfig, ConfigError> {
        self.providers
            .iter()
            .find(|provider| provider.id == self.default_provider)
            .ok_or_else(|| ConfigError::ProviderNotFound {
                provider: self.default_provider.clone(),
            })
    }
}
