use crate::application::catalog::SchemaError;
use crate::application::tooling::ToolInvokeError;
use crate::domain::types::ToolFailureKind;
use crate::infrastructure::model::ModelError;
use thiserror::Error;

/// Failures that abort one query. The conversation keeps every turn
/// appended before the failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model kept requesting tools after {limit} tool call(s)")]
    ToolBudgetExhausted { limit: usize },
}

impl ResolveError {
    pub fn user_message(&self) -> String {
        match self {
            ResolveError::Model(err) => err.user_message(),
            ResolveError::ToolBudgetExhausted { limit } => format!(
                "Stopped after {limit} tool call(s) without a final answer. Try a more specific question or raise max_tool_turns."
            ),
        }
    }
}

/// Failures of one tool dispatch. These never abort the query; they are
/// recorded as the call's result so the model can react to them.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("tool '{0}' is not bound to any MCP server")]
    UnboundTool(String),
    #[error("invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: SchemaError,
    },
    #[error("tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },
    #[error("failed to invoke tool '{tool}': {source}")]
    Invocation {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}

impl ToolError {
    pub fn kind(&self) -> ToolFailureKind {
        match self {
            ToolError::UnknownTool(_) | ToolError::UnboundTool(_) => ToolFailureKind::NotFound,
            ToolError::InvalidArguments { .. } => ToolFailureKind::InvalidArguments,
            ToolError::Execution { .. } => ToolFailureKind::Execution,
            ToolError::Invocation {
                source: ToolInvokeError::Cancelled { .. },
                ..
            } => ToolFailureKind::Cancelled,
            ToolError::Invocation { .. } => ToolFailureKind::Transport,
        }
    }
}
