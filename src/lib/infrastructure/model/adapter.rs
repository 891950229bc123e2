//! Message adapters - convert the conversation and tool catalog into the
//! request shapes of each backend.

use crate::application::catalog::FunctionDeclaration;
use crate::domain::types::ConversationTurn;
use serde_json::{Value, json};

/// Adapter for converting turns to different API formats
pub struct MessageAdapter;

impl MessageAdapter {
    /// Gemini `contents`. Tool results travel as `functionResponse` parts on
    /// a user turn right after the model's `functionCall`.
    pub fn to_gemini_contents(turns: &[ConversationTurn]) -> Vec<Value> {
        turns
            .iter()
            .map(|turn| match turn {
                ConversationTurn::UserText(text) => json!({
                    "role": "user",
                    "parts": [{"text": text}]
                }),
                ConversationTurn::ModelText(text) => json!({
                    "role": "model",
                    "parts": [{"text": text}]
                }),
                ConversationTurn::ToolCallRequest(invocation) => json!({
                    "role": "model",
                    "parts": [{"functionCall": {
                        "name": invocation.tool_name,
                        "args": invocation.arguments,
                    }}]
                }),
                ConversationTurn::ToolCallResult {
                    tool_name, outcome, ..
                } => json!({
                    "role": "user",
                    "parts": [{"functionResponse": {
                        "name": tool_name,
                        "response": outcome.to_response_value(),
                    }}]
                }),
            })
            .collect()
    }

    /// Gemini `tools` block, or `None` when there is nothing to declare.
    pub fn to_gemini_tools(declarations: &[FunctionDeclaration]) -> Option<Value> {
        if declarations.is_empty() {
            return None;
        }
        let functions: Vec<Value> = declarations
            .iter()
            .map(|declaration| {
                let mut function = json!({
                    "name": declaration.name,
                    "description": declaration.description,
                });
                // Gemini refuses OBJECT parameters without properties.
                if has_properties(&declaration.parameters) {
                    function["parameters"] = declaration.parameters.clone();
                }
                function
            })
            .collect();
        Some(json!([{ "functionDeclarations": functions }]))
    }

    /// OpenAI chat messages. Arguments are sent as a JSON string and results
    /// are correlated through `tool_call_id`.
    pub fn to_openai_messages(system: Option<&str>, turns: &[ConversationTurn]) -> Vec<Value> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        for turn in turns {
            messages.push(match turn {
                ConversationTurn::UserText(text) => json!({"role": "user", "content": text}),
                ConversationTurn::ModelText(text) => json!({"role": "assistant", "content": text}),
                ConversationTurn::ToolCallRequest(invocation) => json!({
                    "role": "assistant",
                    "content": Value::Null,
                    "tool_calls": [{
                        "id": invocation.call_id,
                        "type": "function",
                        "function": {
                            "name": invocation.tool_name,
                            "arguments": Value::Object(invocation.arguments.clone()).to_string(),
                        }
                    }]
                }),
                ConversationTurn::ToolCallResult {
                    call_id, outcome, ..
                } => json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": outcome.to_response_text(),
                }),
            });
        }
        messages
    }

    /// Tool declarations shared by OpenAI-compatible APIs and Ollama.
    pub fn to_openai_tools(declarations: &[FunctionDeclaration]) -> Vec<Value> {
        declarations
            .iter()
            .map(|declaration| {
                json!({
                    "type": "function",
                    "function": {
                        "name": declaration.name,
                        "description": declaration.description,
                        "parameters": declaration.parameters,
                    }
                })
            })
            .collect()
    }

    /// Ollama chat messages: OpenAI-like, but arguments stay objects and
    /// results are named by tool rather than by call id.
    pub fn to_ollama_messages(system: Option<&str>, turns: &[ConversationTurn]) -> Vec<Value> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        for turn in turns {
            messages.push(match turn {
                ConversationTurn::UserText(text) => json!({"role": "user", "content": text}),
                ConversationTurn::ModelText(text) => json!({"role": "assistant", "content": text}),
                ConversationTurn::ToolCallRequest(invocation) => json!({
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{
                        "function": {
                            "name": invocation.tool_name,
                            "arguments": invocation.arguments,
                        }
                    }]
                }),
                ConversationTurn::ToolCallResult {
                    tool_name, outcome, ..
                } => json!({
                    "role": "tool",
                    "tool_name": tool_name,
                    "content": outcome.to_response_text(),
                }),
            });
        }
        messages
    }
}

fn has_properties(schema: &Value) -> bool {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|properties| !properties.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ToolFailureKind, ToolInvocation, ToolOutcome};
    use serde_json::Map;

    fn add_round_trip() -> Vec<ConversationTurn> {
        let mut args = Map::new();
        args.insert("a".into(), json!(5));
        args.insert("b".into(), json!(6));
        vec![
            ConversationTurn::UserText("what is 5 plus 6?".into()),
            ConversationTurn::ToolCallRequest(
                ToolInvocation::new("add", args).with_call_id("call_1"),
            ),
            ConversationTurn::ToolCallResult {
                call_id: "call_1".into(),
                tool_name: "add".into(),
                outcome: ToolOutcome::Success(json!(11)),
            },
            ConversationTurn::ModelText("11".into()),
        ]
    }

    fn add_declaration() -> FunctionDeclaration {
        FunctionDeclaration {
            name: "add".into(),
            description: "Add two numbers".into(),
            parameters: json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            }),
        }
    }

    #[test]
    fn gemini_contents_carry_function_parts() {
        let contents = MessageAdapter::to_gemini_contents(&add_round_trip());

        assert_eq!(contents.len(), 4);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "add");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["args"]["b"], 6);
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"],
            json!({"result": 11})
        );
        assert_eq!(contents[3]["parts"][0]["text"], "11");
    }

    #[test]
    fn gemini_tools_are_omitted_when_catalog_is_empty() {
        assert!(MessageAdapter::to_gemini_tools(&[]).is_none());

        let tools = MessageAdapter::to_gemini_tools(&[add_declaration()]).unwrap();
        assert_eq!(tools[0]["functionDeclarations"][0]["name"], "add");
        assert_eq!(
            tools[0]["functionDeclarations"][0]["parameters"]["required"],
            json!(["a", "b"])
        );
    }

    #[test]
    fn gemini_drops_empty_parameter_objects() {
        let declaration = FunctionDeclaration {
            name: "now".into(),
            description: "Current time".into(),
            parameters: json!({"type": "object", "properties": {}}),
        };
        let tools = MessageAdapter::to_gemini_tools(&[declaration]).unwrap();
        assert!(tools[0]["functionDeclarations"][0].get("parameters").is_none());
    }

    #[test]
    fn openai_messages_link_results_by_call_id() {
        let messages = MessageAdapter::to_openai_messages(Some("be brief"), &add_round_trip());

        assert_eq!(messages.len(), 5);
        assert_eq!(messages[0], json!({"role": "system", "content": "be brief"}));
        let call = &messages[2]["tool_calls"][0];
        assert_eq!(call["id"], "call_1");
        let arguments: Value =
            serde_json::from_str(call["function"]["arguments"].as_str().unwrap()).unwrap();
        assert_eq!(arguments, json!({"a": 5, "b": 6}));
        assert_eq!(messages[3]["role"], "tool");
        assert_eq!(messages[3]["tool_call_id"], "call_1");
        assert_eq!(messages[3]["content"], "11");
    }

    #[test]
    fn failures_are_reported_as_error_payloads() {
        let turns = vec![ConversationTurn::ToolCallResult {
            call_id: "c".into(),
            tool_name: "subtract".into(),
            outcome: ToolOutcome::failure(ToolFailureKind::NotFound, "unknown tool 'subtract'"),
        }];

        let ollama = MessageAdapter::to_ollama_messages(None, &turns);
        let content: Value = serde_json::from_str(ollama[0]["content"].as_str().unwrap()).unwrap();
        assert_eq!(content["kind"], "not_found");
        assert_eq!(ollama[0]["tool_name"], "subtract");

        let gemini = MessageAdapter::to_gemini_contents(&turns);
        assert_eq!(
            gemini[0]["parts"][0]["functionResponse"]["response"]["error"],
            "unknown tool 'subtract'"
        );
    }

    #[test]
    fn openai_tools_wrap_declarations() {
        let tools = MessageAdapter::to_openai_tools(&[add_declaration()]);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "add");
    }
}
