use super::error::{ConnectionError, TeardownError, ToolInvokeError};
use super::interface::ToolServerInterface;
use super::session::{McpSession, ToolOutput};
use crate::application::catalog::{ToolCatalog, ToolDescriptor};
use crate::config::ServerConfig;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Map as JsonMap, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Owns every live session and the catalog built from their tools.
///
/// Sessions are kept in connection order, so catalog precedence between
/// duplicate tool names follows the order servers were connected.
pub struct ServerManager {
    request_timeout: Duration,
    sessions: RwLock<Vec<McpSession>>,
    catalog: RwLock<Arc<ToolCatalog>>,
}

impl ServerManager {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            sessions: RwLock::new(Vec::new()),
            catalog: RwLock::new(Arc::new(ToolCatalog::default())),
        }
    }

    /// Connects one server and adds its tools to the catalog.
    pub async fn connect(&self, config: &ServerConfig) -> Result<(), ConnectionError> {
        if self.find(&config.name).await.is_some() {
            return Err(ConnectionError::Duplicate {
                server: config.name.clone(),
            });
        }
        let session = McpSession::connect(config, self.request_timeout).await?;
        self.register(session).await?;
        self.rebuild_catalog().await;
        Ok(())
    }

    /// Registers an already initialized session.
    pub async fn attach(&self, session: McpSession) -> Result<(), ConnectionError> {
        self.register(session).await?;
        self.rebuild_catalog().await;
        Ok(())
    }

    /// Connects every server concurrently. A failing server does not prevent
    /// the others from joining; its error is returned instead.
    pub async fn connect_all(&self, configs: &[ServerConfig]) -> Vec<ConnectionError> {
        let attempts = configs
            .iter()
            .map(|config| McpSession::connect(config, self.request_timeout));
        let results = join_all(attempts).await;

        let mut failures = Vec::new();
        for result in results {
            let outcome = match result {
                Ok(session) => self.register(session).await,
                Err(err) => Err(err),
            };
            if let Err(err) = outcome {
                warn!(server = err.server(), %err, "MCP server unavailable");
                failures.push(err);
            }
        }
        self.rebuild_catalog().await;
        failures
    }

    pub async fn servers(&self) -> Vec<String> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|session| session.name().to_string())
            .collect()
    }

    pub async fn list_tools(&self, server: &str) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        self.session(server).await?.list_tools().await
    }

    pub async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: JsonMap<String, Value>,
    ) -> Result<ToolOutput, ToolInvokeError> {
        self.session(server).await?.call_tool(tool, arguments).await
    }

    /// Re-lists tools on every session the server marked stale and rebuilds
    /// the catalog.
    pub async fn refresh_catalog(&self) -> Arc<ToolCatalog> {
        let stale: Vec<McpSession> = self
            .sessions
            .read()
            .await
            .iter()
            .filter(|session| session.tools_stale() && session.is_usable())
            .cloned()
            .collect();
        for session in stale {
            info!(server = session.name(), "Refreshing tool list after change notification");
            if let Err(err) = session.list_tools().await {
                warn!(server = session.name(), %err, "failed to refresh tool list");
            }
        }
        self.rebuild_catalog().await
    }

    /// Closes every session, attempting all of them even when some fail.
    pub async fn close_all(&self) -> Result<(), TeardownError> {
        let sessions: Vec<McpSession> = self.sessions.write().await.drain(..).collect();
        *self.catalog.write().await = Arc::new(ToolCatalog::default());
        if sessions.is_empty() {
            return Ok(());
        }

        let results = join_all(sessions.iter().map(McpSession::close)).await;
        let failures: Vec<ToolInvokeError> = results.into_iter().filter_map(Result::err).collect();
        info!(
            closed = sessions.len() - failures.len(),
            failed = failures.len(),
            "MCP sessions torn down"
        );
        if failures.is_empty() {
            Ok(())
        } else {
            Err(TeardownError { failures })
        }
    }

    async fn register(&self, session: McpSession) -> Result<(), ConnectionError> {
        if let Err(source) = session.list_tools().await {
            let server = session.name().to_string();
            if let Err(err) = session.close().await {
                warn!(server = %server, %err, "failed to close session after listing error");
            }
            return Err(ConnectionError::Handshake { server, source });
        }

        let mut sessions = self.sessions.write().await;
        if sessions.iter().any(|existing| existing.name() == session.name()) {
            let server = session.name().to_string();
            drop(sessions);
            if let Err(err) = session.close().await {
                warn!(server = %server, %err, "failed to close duplicate session");
            }
            return Err(ConnectionError::Duplicate { server });
        }
        info!(server = session.name(), "MCP server connected");
        sessions.push(session);
        Ok(())
    }

    async fn rebuild_catalog(&self) -> Arc<ToolCatalog> {
        let sessions: Vec<McpSession> = self.sessions.read().await.clone();
        let mut descriptors = Vec::new();
        for session in sessions.iter().filter(|session| session.is_usable()) {
            descriptors.extend(session.cached_tools().await);
        }
        let catalog = Arc::new(ToolCatalog::build(descriptors));
        *self.catalog.write().await = Arc::clone(&catalog);
        catalog
    }

    async fn find(&self, server: &str) -> Option<McpSession> {
        self.sessions
            .read()
            .await
            .iter()
            .find(|session| session.name() == server)
            .cloned()
    }

    async fn session(&self, server: &str) -> Result<McpSession, ToolInvokeError> {
        self.find(server)
            .await
            .ok_or_else(|| ToolInvokeError::NotConfigured {
                server: server.to_string(),
            })
    }
}

#[async_trait]
impl ToolServerInterface for ServerManager {
    async fn catalog(&self) -> Arc<ToolCatalog> {
        let needs_refresh = self
            .sessions
            .read()
            .await
            .iter()
            .any(|session| session.tools_stale() || !session.is_usable());
        if needs_refresh {
            return self.refresh_catalog().await;
        }
        Arc::clone(&*self.catalog.read().await)
    }

    async fn instructions(&self) -> Vec<(String, String)> {
        let sessions = self.sessions.read().await.clone();
        let mut found = Vec::new();
        for session in sessions {
            if let Some(text) = session.instructions().await {
                found.push((session.name().to_string(), text));
            }
        }
        found
    }

    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: JsonMap<String, Value>,
    ) -> Result<ToolOutput, ToolInvokeError> {
        self.call_tool(server, tool, arguments).await
    }
}
