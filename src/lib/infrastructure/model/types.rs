//! Model types - Request, Reply, and Error types

use crate::application::catalog::FunctionDeclaration;
use crate::domain::types::{ConversationTurn, ToolInvocation};
use reqwest::StatusCode;
use thiserror::Error;

/// One model call: the whole conversation plus the tools on offer.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    pub turns: Vec<ConversationTurn>,
    /// Empty when no tools are available; backends then omit the tool block.
    pub tools: Vec<FunctionDeclaration>,
}

/// What the model decided, classified once per call.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    FinalAnswer { text: String },
    ToolCall(ToolInvocation),
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' is not configured")]
    ProviderNotFound { provider: String },
    #[error("provider '{provider}' requires an API key")]
    MissingApiKey { provider: String },
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' answered HTTP {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ModelError {
    pub fn provider_not_found(provider: impl Into<String>) -> Self {
        Self::ProviderNotFound {
            provider: provider.into(),
        }
    }

    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn status(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Short explanation suitable for the interactive prompt.
    pub fn user_message(&self) -> String {
        match self {
            ModelError::ProviderNotFound { provider } => {
                format!("Model provider '{provider}' is not configured. Check client.toml.")
            }
            ModelError::MissingApiKey { provider } => {
                format!("Provider '{provider}' needs an API key. Set it in config/.env.")
            }
            ModelError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Could not reach model provider '{provider}'.")
                } else if source.is_timeout() {
                    format!("Request to '{provider}' timed out.")
                } else {
                    format!("Network error talking to '{provider}'.")
                }
            }
            ModelError::Status {
                provider,
                status,
                message,
            } => match StatusCode::from_u16(*status) {
                Ok(StatusCode::NOT_FOUND) => {
                    format!("Endpoint or model not found on '{provider}': {message}")
                }
                Ok(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                    format!("Provider '{provider}' rejected the API key.")
                }
                Ok(StatusCode::TOO_MANY_REQUESTS) => {
                    format!("Provider '{provider}' is rate limiting requests; try again later.")
                }
                Ok(StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY) => {
                    format!("Provider '{provider}' is currently unavailable.")
                }
                _ => format!("Request to '{provider}' failed ({status}): {message}"),
            },
            ModelError::InvalidResponse { provider, .. } => {
                format!("Provider '{provider}' returned a response that could not be understood.")
            }
        }
    }
}
