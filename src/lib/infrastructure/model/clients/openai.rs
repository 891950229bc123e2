//! OpenAI-compatible client implementation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::base::HttpClientBase;
use crate::config::ModelProviderConfig;
use crate::constants::DEFAULT_OPENAI_API_PATH;
use crate::domain::types::ToolInvocation;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::factory::resolve_api_key;
use crate::infrastructure::model::traits::ModelProvider;
use crate::infrastructure::model::types::{ModelError, ModelReply, ModelRequest};

/// OpenAI-compatible client (works with OpenAI, Mistral, Groq, etc.)
#[derive(Clone)]
pub struct OpenAIClient {
    base: HttpClientBase,
    api_path: String,
}

impl OpenAIClient {
    pub fn from_config(config: &ModelProviderConfig, timeout: Duration) -> Result<Self, ModelError> {
        let api_key = resolve_api_key(&config.id, config.api_key.as_deref());
        Ok(Self {
            base: HttpClientBase::new(config.id.clone(), config.endpoint.clone(), api_key, timeout)?,
            api_path: config
                .api_path
                .clone()
                .unwrap_or_else(|| DEFAULT_OPENAI_API_PATH.to_string()),
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAIClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let url = self.base.build_url(&self.api_path);

        let payload = OpenAIRequest {
            model: request.model.clone(),
            messages: MessageAdapter::to_openai_messages(
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
            "Sending request to OpenAI-compatible provider"
        );

        let response: OpenAIResponse = self.base.post_with_bearer(&url, &payload).await?;
        debug!("Received response from OpenAI-compatible provider");
        parse_reply(&self.base.id, response)
    }
}

fn parse_reply(provider: &str, response: OpenAIResponse) -> Result<ModelReply, ModelError> {
    let message = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| ModelError::invalid_response(provider, "missing message"))?;

    let mut calls = message.tool_calls.unwrap_or_default().into_iter();
    if let Some(call) = calls.next() {
        let dropped = calls.len();
        if dropped > 0 {
            warn!(provider, dropped, "model requested several function calls; only the first is used");
        }
        let arguments = parse_arguments(provider, &call.function.arguments)?;
        let invocation = ToolInvocation::new(call.function.name, arguments);
        return Ok(ModelReply::ToolCall(match call.id {
            Some(id) => invocation.with_call_id(id),
            None => invocation,
        }));
    }

    Ok(ModelReply::FinalAnswer {
        text: message.content.unwrap_or_default(),
    })
}

/// Arguments arrive as a JSON-encoded string.
fn parse_arguments(provider: &str, raw: &str) -> Result<JsonMap<String, Value>, ModelError> {
    if raw.trim().is_empty() {
        return Ok(JsonMap::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(JsonMap::new()),
        Ok(other) => Err(ModelError::invalid_response(
            provider,
            format!("function call arguments must be an object, got {other}"),
        )),
        Err(err) => Err(ModelError::invalid_response(
            provider,
            format!("function call arguments are not valid JSON: {err}"),
        )),
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Deserialize)]
struct OpenAIToolCall {
    id: Option<String>,
    function: OpenAIFunctionCall,
}

#[derive(Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> Result<ModelReply, ModelError> {
        parse_reply("openai", serde_json::from_value(body).unwrap())
    }

    #[test]
    fn tool_call_keeps_provider_id() {
        let reply = parse(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_abc",
                    "type": "function",
                    "function": {"name": "add", "arguments": "{\"a\":5,\"b\":6}"}
                }]
            }}]
        }))
        .unwrap();

        match reply {
            ModelReply::ToolCall(invocation) => {
                assert_eq!(invocation.call_id, "call_abc");
                assert_eq!(invocation.tool_name, "add");
                assert_eq!(invocation.arguments["a"], json!(5));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn plain_content_is_final_answer() {
        let reply = parse(json!({
            "choices": [{"message": {"role": "assistant", "content": "11"}}]
        }))
        .unwrap();
        assert_eq!(reply, ModelReply::FinalAnswer { text: "11".into() });
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let err = parse(json!({
            "choices": [{"message": {"tool_calls": [{
                "id": "x",
                "function": {"name": "add", "arguments": "{a:5"}
            }]}}]
        }))
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidResponse { .. }));
    }

    #[test]
    fn empty_choices_are_rejected() {
        assert!(parse(json!({"choices": []})).is_err());
    }
}
