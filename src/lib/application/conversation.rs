//! Ordered turn history threaded into every model request.
//!
//! Turns are append-only. A tool call is recorded through
//! [`Conversation::begin_tool_call`], whose guard borrows the conversation
//! mutably until the matching result is recorded, so nothing can be appended
//! between a request and its result.

use crate::domain::types::{ConversationTurn, ToolFailureKind, ToolInvocation, ToolOutcome};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::UserText(text.into()));
    }

    pub fn push_model_text(&mut self, text: impl Into<String>) {
        self.turns.push(ConversationTurn::ModelText(text.into()));
    }

    /// Records the request and returns a guard that records the result.
    ///
    /// Dropping the guard without completing it records a `cancelled`
    /// failure for the call.
    pub fn begin_tool_call(&mut self, invocation: ToolInvocation) -> PendingToolCall<'_> {
        let call_id = invocation.call_id.clone();
        let tool_name = invocation.tool_name.clone();
        self.turns.push(ConversationTurn::ToolCallRequest(invocation));
        PendingToolCall {
            conversation: self,
            call_id,
            tool_name,
            completed: false,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    fn push_result(&mut self, call_id: String, tool_name: String, outcome: ToolOutcome) {
        self.turns.push(ConversationTurn::ToolCallResult {
            call_id,
            tool_name,
            outcome,
        });
    }
}

/// An outstanding tool call. See [`Conversation::begin_tool_call`].
#[must_use = "a pending tool call records a cancellation when dropped"]
pub struct PendingToolCall<'a> {
    conversation: &'a mut Conversation,
    call_id: String,
    tool_name: String,
    completed: bool,
}

impl PendingToolCall<'_> {
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    pub fn complete(mut self, outcome: ToolOutcome) {
        self.completed = true;
        let call_id = std::mem::take(&mut self.call_id);
        let tool_name = std::mem::take(&mut self.tool_name);
        self.conversation.push_result(call_id, tool_name, outcome);
    }
}

impl Drop for PendingToolCall<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        debug!(tool = %self.tool_name, "tool call abandoned before completion");
        let outcome = ToolOutcome::failure(
            ToolFailureKind::Cancelled,
            format!("call to tool '{}' was cancelled", self.tool_name),
        );
        self.conversation.push_result(
            std::mem::take(&mut self.call_id),
            std::mem::take(&mut self.tool_name),
            outcome,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn invocation(name: &str) -> ToolInvocation {
        let mut args = Map::new();
        args.insert("a".into(), json!(1));
        ToolInvocation::new(name, args).with_call_id(format!("id-{name}"))
    }

    fn assert_round_trips(turns: &[ConversationTurn]) {
        for (index, turn) in turns.iter().enumerate() {
            if let ConversationTurn::ToolCallRequest(request) = turn {
                match turns.get(index + 1) {
                    Some(ConversationTurn::ToolCallResult { call_id, .. }) => {
                        assert_eq!(call_id, &request.call_id)
                    }
                    other => panic!("request not followed by its result: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn completed_call_appends_matching_result() {
        let mut conversation = Conversation::new();
        conversation.push_user("what is 1 plus 1?");
        conversation
            .begin_tool_call(invocation("add"))
            .complete(ToolOutcome::Success(json!(2)));
        conversation.push_model_text("2");

        assert_eq!(conversation.len(), 4);
        assert_round_trips(conversation.turns());
        assert_eq!(
            conversation.turns()[2],
            ConversationTurn::ToolCallResult {
                call_id: "id-add".into(),
                tool_name: "add".into(),
                outcome: ToolOutcome::Success(json!(2)),
            }
        );
    }

    #[test]
    fn dropped_call_records_cancellation() {
        let mut conversation = Conversation::new();
        {
            let pending = conversation.begin_tool_call(invocation("slow"));
            assert_eq!(pending.tool_name(), "slow");
        }

        assert_round_trips(conversation.turns());
        match &conversation.turns()[1] {
            ConversationTurn::ToolCallResult { outcome, .. } => {
                assert!(matches!(
                    outcome,
                    ToolOutcome::Failure {
                        kind: ToolFailureKind::Cancelled,
                        ..
                    }
                ));
            }
            other => panic!("unexpected turn {other:?}"),
        }
    }

    #[test]
    fn sequential_calls_stay_paired() {
        let mut conversation = Conversation::new();
        conversation.push_user("do two things");
        conversation
            .begin_tool_call(invocation("first"))
            .complete(ToolOutcome::Success(json!("ok")));
        conversation
            .begin_tool_call(invocation("second"))
            .complete(ToolOutcome::failure(ToolFailureKind::Execution, "boom"));

        assert_eq!(conversation.len(), 5);
        assert_round_trips(conversation.turns());
        conversation.clear();
        assert!(conversation.is_empty());
    }
}
