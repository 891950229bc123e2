mod execution;

use crate::application::tooling::ToolServerInterface;
use std::sync::Arc;

/// Dispatches tool invocations against the current catalog.
pub(crate) struct ToolRuntime {
    bridge: Arc<dyn ToolServerInterface>,
}

impl ToolRuntime {
    pub(crate) fn new(bridge: Arc<dyn ToolServerInterface>) -> Self {
        Self { bridge }
    }
}
