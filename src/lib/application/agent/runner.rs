use super::errors::ResolveError;
use super::models::{AgentStep, Resolution, ResolverOptions};
use super::runtime::ToolRuntime;
use crate::application::conversation::Conversation;
use crate::application::tooling::ToolServerInterface;
use crate::domain::types::{ToolFailureKind, ToolOutcome};
use crate::infrastructure::model::{ModelProvider, ModelReply, ModelRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drives one query to a final answer: model call, optional tool dispatch,
/// repeat until the model answers in text or the tool budget is spent.
pub struct QueryResolver<P: ModelProvider> {
    provider: P,
    bridge: Arc<dyn ToolServerInterface>,
    runtime: ToolRuntime,
    options: ResolverOptions,
}

impl<P: ModelProvider> QueryResolver<P> {
    pub fn new(provider: P, bridge: Arc<dyn ToolServerInterface>, options: ResolverOptions) -> Self {
        Self {
            provider,
            runtime: ToolRuntime::new(Arc::clone(&bridge)),
            bridge,
            options,
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub async fn resolve(
        &self,
        conversation: &mut Conversation,
        query: &str,
    ) -> Result<Resolution, ResolveError> {
        info!(
            provider = self.provider.id(),
            model = self.options.model.as_str(),
            "Resolving query"
        );
        conversation.push_user(query);

        let mut trace = Vec::new();
        let mut steps = Vec::new();
        let mut tool_turns = 0usize;
        let system_prompt = self.system_prompt().await;

        loop {
            let catalog = self.bridge.catalog().await;
            let request = ModelRequest {
                model: self.options.model.clone(),
                system_prompt: system_prompt.clone(),
                turns: conversation.turns().to_vec(),
                tools: catalog.translated_for_model(),
            };
            debug!(
                turns = request.turns.len(),
                tools = request.tools.len(),
                tool_turns,
                "Submitting turn to model provider"
            );

            let invocation = match self.provider.generate(request).await? {
                ModelReply::FinalAnswer { text } => {
                    info!(tool_calls = steps.len(), "Model returned final answer");
                    conversation.push_model_text(text.clone());
                    return Ok(Resolution {
                        response: text,
                        trace,
                        steps,
                    });
                }
                ModelReply::ToolCall(invocation) => invocation,
            };

            if tool_turns >= self.options.max_tool_turns {
                warn!(
                    limit = self.options.max_tool_turns,
                    tool = %invocation.tool_name,
                    "Tool budget exhausted"
                );
                let limit = self.options.max_tool_turns;
                conversation
                    .begin_tool_call(invocation)
                    .complete(ToolOutcome::failure(
                        ToolFailureKind::BudgetExhausted,
                        format!("tool budget of {limit} call(s) per query exhausted"),
                    ));
                return Err(ResolveError::ToolBudgetExhausted { limit });
            }
            tool_turns += 1;

            info!(tool = %invocation.tool_name, "Model requested tool execution");
            trace.push(invocation.annotation());
            let pending = conversation.begin_tool_call(invocation.clone());
            let outcome = match self.runtime.execute(&catalog, &invocation).await {
                Ok(value) => ToolOutcome::Success(value),
                Err(err) => {
                    warn!(tool = %invocation.tool_name, %err, "Tool call failed; reporting to model");
                    ToolOutcome::failure(err.kind(), err.to_string())
                }
            };
            steps.push(AgentStep {
                tool: invocation.tool_name,
                arguments: invocation.arguments,
                success: outcome.is_success(),
            });
            pending.complete(outcome);
        }
    }

    /// Configured system prompt followed by each server's own instructions.
    async fn system_prompt(&self) -> Option<String> {
        let mut sections: Vec<String> = self.options.system_prompt.iter().cloned().collect();
        for (server, text) in self.bridge.instructions().await {
            let text = text.trim();
            if !text.is_empty() {
                sections.push(format!("Instructions from tool server '{server}':\n{text}"));
            }
        }
        (!sections.is_empty()).then(|| sections.join("\n\n"))
    }
}
