use serde::Serialize;
use serde_json::{Map as JsonMap, Value, json};
use uuid::Uuid;

/// A function call extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    /// Correlation id. Provider-assigned when the backend has one, generated otherwise.
    pub call_id: String,
    pub tool_name: String,
    pub arguments: JsonMap<String, Value>,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, arguments: JsonMap<String, Value>) -> Self {
        Self {
            call_id: format!("call-{}", Uuid::new_v4()),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    /// Trace annotation shown to the user alongside the final answer.
    pub fn annotation(&self) -> String {
        format!(
            "[Calling tool {} with args {}]",
            self.tool_name,
            Value::Object(self.arguments.clone())
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFailureKind {
    NotFound,
    InvalidArguments,
    Execution,
    Transport,
    Cancelled,
    BudgetExhausted,
}

impl ToolFailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolFailureKind::NotFound => "not_found",
            ToolFailureKind::InvalidArguments => "invalid_arguments",
            ToolFailureKind::Execution => "execution",
            ToolFailureKind::Transport => "transport",
            ToolFailureKind::Cancelled => "cancelled",
            ToolFailureKind::BudgetExhausted => "budget_exhausted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(Value),
    Failure { kind: ToolFailureKind, message: String },
}

impl ToolOutcome {
    pub fn failure(kind: ToolFailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    /// Object payload handed back to the model as the function response.
    pub fn to_response_value(&self) -> Value {
        match self {
            ToolOutcome::Success(value) => json!({ "result": value }),
            ToolOutcome::Failure { kind, message } => json!({
                "error": message,
                "kind": kind.as_str(),
            }),
        }
    }

    /// Flat text rendering for backends that only accept string tool content.
    pub fn to_response_text(&self) -> String {
        match self {
            ToolOutcome::Success(Value::String(text)) => text.clone(),
            ToolOutcome::Success(value) => value.to_string(),
            ToolOutcome::Failure { .. } => self.to_response_value().to_string(),
        }
    }
}

/// One entry of the conversation history threaded into every model request.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationTurn {
    UserText(String),
    ModelText(String),
    ToolCallRequest(ToolInvocation),
    ToolCallResult {
        call_id: String,
        tool_name: String,
        outcome: ToolOutcome,
    },
}

impl ConversationTurn {
    pub fn is_tool_request(&self) -> bool {
        matches!(self, ConversationTurn::ToolCallRequest(_))
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, ConversationTurn::ToolCallResult { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotation_names_tool_and_arguments() {
        let mut args = JsonMap::new();
        args.insert("a".into(), json!(5));
        args.insert("b".into(), json!(6));
        let invocation = ToolInvocation::new("add", args);

        assert_eq!(
            invocation.annotation(),
            r#"[Calling tool add with args {"a":5,"b":6}]"#
        );
    }

    #[test]
    fn failure_payload_carries_kind_and_message() {
        let outcome = ToolOutcome::failure(ToolFailureKind::NotFound, "tool 'subtract' is not available");
        let payload = outcome.to_response_value();
        assert_eq!(payload["kind"], "not_found");
        assert_eq!(payload["error"], "tool 'subtract' is not available");
        assert!(!outcome.is_success());
    }

    #[test]
    fn string_success_renders_without_quotes() {
        let outcome = ToolOutcome::Success(json!("11"));
        assert_eq!(outcome.to_response_text(), "11");
        assert_eq!(ToolOutcome::Success(json!(11)).to_response_text(), "11");
    }
}
