use crate::config::defaults::DEFAULT_MAX_TOOL_TURNS;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value};

#[derive(Debug, Clone, Serialize)]
pub struct AgentStep {
    pub tool: String,
    pub arguments: JsonMap<String, Value>,
    pub success: bool,
}

/// Answer to one query.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub response: String,
    /// `[Calling tool ...]` annotations, one per dispatched call.
    pub trace: Vec<String>,
    pub steps: Vec<AgentStep>,
}

impl Resolution {
    /// Trace annotations followed by the model's concluding text.
    pub fn render(&self) -> String {
        self.trace
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.response.as_str()))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub model: String,
    pub system_prompt: Option<String>,
    /// Tool calls allowed per query before the query fails.
    pub max_tool_turns: usize,
}

impl ResolverOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|prompt| !prompt.trim().is_empty());
        self
    }

    pub fn with_max_tool_turns(mut self, limit: usize) -> Self {
        self.max_tool_turns = limit;
        self
    }
}
