use super::ToolRuntime;
use crate::application::agent::errors::ToolError;
use crate::application::catalog::{ToolCatalog, validate_arguments};
use crate::application::tooling::ToolInvokeError;
use crate::domain::types::ToolInvocation;
use serde_json::Value;
use tracing::{debug, info, warn};

impl ToolRuntime {
    /// Runs one invocation. Every failure comes back as a [`ToolError`] so
    /// the caller can record it as the call's result.
    pub(crate) async fn execute(
        &self,
        catalog: &ToolCatalog,
        invocation: &ToolInvocation,
    ) -> Result<Value, ToolError> {
        let tool_name = invocation.tool_name.as_str();
        let Some(entry) = catalog.get(tool_name) else {
            warn!(requested_tool = %tool_name, "Unknown tool requested by model");
            return Err(ToolError::UnknownTool(tool_name.to_string()));
        };

        let Some(server_name) = entry.descriptor.server.as_deref() else {
            warn!(tool = %tool_name, "Tool has no server binding");
            return Err(ToolError::UnboundTool(tool_name.to_string()));
        };

        validate_arguments(&entry.model_schema, &invocation.arguments).map_err(|source| {
            ToolError::InvalidArguments {
                tool: tool_name.to_string(),
                source,
            }
        })?;

        debug!(tool = %tool_name, server = %server_name, "Dispatching tool via MCP");
        match self
            .bridge
            .invoke_tool(server_name, tool_name, invocation.arguments.clone())
            .await
        {
            Ok(output) if output.is_error => {
                let message = output
                    .message
                    .unwrap_or_else(|| format!("tool '{tool_name}' reported an error"));
                info!(tool = %tool_name, success = false, "Tool executed");
                Err(ToolError::Execution {
                    tool: tool_name.to_string(),
                    message,
                })
            }
            Ok(output) => {
                info!(tool = %tool_name, success = true, "Tool executed");
                Ok(output.value)
            }
            Err(ToolInvokeError::NotConfigured { .. }) => {
                Err(ToolError::UnboundTool(tool_name.to_string()))
            }
            Err(source) => {
                warn!(tool = %tool_name, server = %server_name, %source, "Tool invocation failed");
                Err(ToolError::Invocation {
                    tool: tool_name.to_string(),
                    source,
                })
            }
        }
    }
}
