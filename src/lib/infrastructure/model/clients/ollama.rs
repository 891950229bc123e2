//! Ollama client implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::base::HttpClientBase;
use crate::config::ModelProviderConfig;
use crate::domain::types::ToolInvocation;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::traits::ModelProvider;
use crate::infrastructure::model::types::{ModelError, ModelReply, ModelRequest};

/// Ollama client for local LLM
#[derive(Clone)]
pub struct OllamaClient {
    base: HttpClientBase,
}

impl OllamaClient {
    /// Creates client from provider config.
    pub fn from_config(config: &ModelProviderConfig, timeout: Duration) -> Result<Self, ModelError> {
        Ok(Self {
            base: HttpClientBase::new(config.id.clone(), config.endpoint.clone(), None, timeout)?,
        })
    }
}

#[async_trait]
impl ModelProvider for OllamaClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let url = self.base.build_url("/api/chat");

        let payload = OllamaRequest {
            model: request.model.clone(),
            messages: MessageAdapter::to_ollama_messages(
                request.system_prompt.as_deref(),
                &request.turns,
            ),
            tools: MessageAdapter::to_openai_tools(&request.tools),
            stream: false,
        };

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Sending request to Ollama"
        );

        let response: OllamaResponse = self.base.post_no_auth(&url, &payload).await?;
        debug!("Received response from Ollama");
        parse_reply(&self.base.id, response)
    }
}

fn parse_reply(provider: &str, response: OllamaResponse) -> Result<ModelReply, ModelError> {
    let message = response
        .message
        .ok_or_else(|| ModelError::invalid_response(provider, "missing message"))?;

    let mut calls = message.tool_calls.unwrap_or_default().into_iter();
    if let Some(call) = calls.next() {
        let dropped = calls.len();
        if dropped > 0 {
            warn!(provider, dropped, "model requested several function calls; only the first is used");
        }
        let arguments = match call.function.arguments {
            Value::Object(map) => map,
            Value::Null => JsonMap::new(),
            other => {
                return Err(ModelError::invalid_response(
                    provider,
                    format!("function call arguments must be an object, got {other}"),
                ));
            }
        };
        return Ok(ModelReply::ToolCall(ToolInvocation::new(
            call.function.name,
            arguments,
        )));
    }

    Ok(ModelReply::FinalAnswer {
        text: message.content,
    })
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    tool_calls: Option<Vec<OllamaToolCall>>,
}

#[derive(Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}
