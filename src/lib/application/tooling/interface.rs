use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value};
use std::sync::Arc;

use super::error::ToolInvokeError;
use super::session::ToolOutput;
use crate::application::catalog::ToolCatalog;

/// What the query resolver needs from the set of connected tool servers.
#[async_trait]
pub trait ToolServerInterface: Send + Sync {
    /// Current catalog of every tool the connected servers offer.
    async fn catalog(&self) -> Arc<ToolCatalog>;

    /// `(server, instructions)` for every server that sent usage
    /// instructions during its handshake.
    async fn instructions(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: JsonMap<String, Value>,
    ) -> Result<ToolOutput, ToolInvokeError>;
}
