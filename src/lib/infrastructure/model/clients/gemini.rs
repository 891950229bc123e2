//! Gemini client implementation

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::base::HttpClientBase;
use crate::config::ModelProviderConfig;
use crate::constants::DEFAULT_GEMINI_API_PATH;
use crate::domain::types::ToolInvocation;
use crate::infrastructure::model::adapter::MessageAdapter;
use crate::infrastructure::model::factory::resolve_api_key;
use crate::infrastructure::model::traits::ModelProvider;
use crate::infrastructure::model::types::{ModelError, ModelReply, ModelRequest};

/// Gemini client for Google AI
#[derive(Clone)]
pub struct GeminiClient {
    base: HttpClientBase,
    api_path: String,
}

impl GeminiClient {
    pub fn from_config(config: &ModelProviderConfig, timeout: Duration) -> Result<Self, ModelError> {
        let api_key = resolve_api_key(&config.id, config.api_key.as_deref());
        Ok(Self {
            base: HttpClientBase::new(config.id.clone(), config.endpoint.clone(), api_key, timeout)?,
            api_path: config
                .api_path
                .clone()
                .unwrap_or_else(|| DEFAULT_GEMINI_API_PATH.to_string()),
        })
    }

    fn build_model_url(&self, model: &str) -> String {
        let path = self.api_path.trim_matches('/');
        self.base.build_url(&format!("{path}/{model}:generateContent"))
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    fn id(&self) -> &str {
        &self.base.id
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        let url = self.build_model_url(&request.model);

        let mut payload = json!({
            "contents": MessageAdapter::to_gemini_contents(&request.turns),
        });
        if let Some(tools) = MessageAdapter::to_gemini_tools(&request.tools) {
            payload["tools"] = tools;
        }
        if let Some(system) = &request.system_prompt {
            payload["system_instruction"] = json!({
                "parts": [{"text": system}]
            });
        }

        info!(
            provider = self.base.id.as_str(),
            model = request.model.as_str(),
            turns = request.turns.len(),
            tools = request.tools.len(),
            "Sending request to Gemini"
        );

        let response: GeminiResponse = self.base.post_with_query_key(&url, &payload).await?;
        debug!("Received response from Gemini");
        parse_reply(&self.base.id, response)
    }
}

fn parse_reply(provider: &str, response: GeminiResponse) -> Result<ModelReply, ModelError> {
    let Some(candidate) = response.candidates.unwrap_or_default().into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("prompt blocked: {reason}"))
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ModelError::invalid_response(provider, reason));
    };

    let parts = candidate.content.map(|content| content.parts).unwrap_or_default();
    let mut calls = parts.iter().filter_map(|part| part.function_call.as_ref());
    if let Some(call) = calls.next() {
        let dropped = calls.count();
        if dropped > 0 {
            warn!(provider, dropped, "model requested several function calls; only the first is used");
        }
        let arguments = match &call.args {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => JsonMap::new(),
            Some(other) => {
                return Err(ModelError::invalid_response(
                    provider,
                    format!("function call arguments must be an object, got {other}"),
                ));
            }
        };
        return Ok(ModelReply::ToolCall(ToolInvocation::new(
            call.name.clone(),
            arguments,
        )));
    }

    let texts: Vec<&str> = parts.iter().filter_map(|part| part.text.as_deref()).collect();
    if texts.is_empty() {
        let reason = candidate
            .finish_reason
            .map(|reason| format!("empty candidate (finish reason {reason})"))
            .unwrap_or_else(|| "missing text".to_string());
        return Err(ModelError::invalid_response(provider, reason));
    }
    Ok(ModelReply::FinalAnswer {
        text: texts.join("\n"),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
    function_call: Option<GeminiFunctionCall>,
}

#[derive(Deserialize)]
struct GeminiFunctionCall {
    name: String,
    args: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: Value) -> Result<ModelReply, ModelError> {
        parse_reply("gemini", serde_json::from_value(body).unwrap())
    }

    #[test]
    fn function_call_part_becomes_tool_call() {
        let reply = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "add", "args": {"a": 5, "b": 6}}}
                ]},
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        match reply {
            ModelReply::ToolCall(invocation) => {
                assert_eq!(invocation.tool_name, "add");
                assert_eq!(Value::Object(invocation.arguments), json!({"a": 5, "b": 6}));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn only_first_of_several_calls_is_used() {
        let reply = parse(json!({
            "candidates": [{"content": {"parts": [
                {"functionCall": {"name": "list_directory", "args": {"path": "/tmp"}}},
                {"functionCall": {"name": "read_file", "args": {"path": "/tmp/a"}}}
            ]}}]
        }))
        .unwrap();
        assert!(matches!(
            reply,
            ModelReply::ToolCall(ToolInvocation { ref tool_name, .. }) if tool_name == "list_directory"
        ));
    }

    #[test]
    fn text_parts_become_final_answer() {
        let reply = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "11"}, {"text": "Done."}]}}]
        }))
        .unwrap();
        assert_eq!(
            reply,
            ModelReply::FinalAnswer {
                text: "11\nDone.".into()
            }
        );
    }

    #[test]
    fn blocked_prompt_is_invalid_response() {
        let err = parse(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn missing_args_default_to_empty_object() {
        let reply = parse(json!({
            "candidates": [{"content": {"parts": [{"functionCall": {"name": "now"}}]}}]
        }))
        .unwrap();
        match reply {
            ModelReply::ToolCall(invocation) => assert!(invocation.arguments.is_empty()),
            other => panic!("unexpected reply {other:?}"),
        }
    }
}
