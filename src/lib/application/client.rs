use super::agent::{QueryResolver, Resolution, ResolveError, ResolverOptions};
use super::catalog::ToolCatalog;
use super::conversation::Conversation;
use super::tooling::{ServerManager, TeardownError, ToolServerInterface};
use crate::infrastructure::model::ModelProvider;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Everything one conversation needs: the resolver, the tool servers and
/// the turn history. Built once per run and torn down with [`McpClient::shutdown`].
pub struct McpClient<P: ModelProvider> {
    resolver: QueryResolver<P>,
    manager: Arc<ServerManager>,
    conversation: Mutex<Conversation>,
}

impl<P: ModelProvider> McpClient<P> {
    pub fn new(provider: P, manager: Arc<ServerManager>, options: ResolverOptions) -> Self {
        let bridge: Arc<dyn ToolServerInterface> = manager.clone();
        Self {
            resolver: QueryResolver::new(provider, bridge, options),
            manager,
            conversation: Mutex::new(Conversation::new()),
        }
    }

    /// Resolves one query against the shared conversation.
    pub async fn ask(&self, query: &str) -> Result<Resolution, ResolveError> {
        info!(query = %Self::summarise(query), "Received query");
        let mut conversation = self.conversation.lock().await;
        let result = self.resolver.resolve(&mut conversation, query).await;
        debug!(turns = conversation.len(), "Conversation updated");
        result
    }

    /// Forgets every turn; servers stay connected.
    pub async fn reset(&self) {
        self.conversation.lock().await.clear();
        info!("Conversation history cleared");
    }

    pub async fn history_len(&self) -> usize {
        self.conversation.lock().await.len()
    }

    pub async fn catalog(&self) -> Arc<ToolCatalog> {
        self.manager.catalog().await
    }

    pub async fn servers(&self) -> Vec<String> {
        self.manager.servers().await
    }

    pub fn model(&self) -> &str {
        &self.resolver.options().model
    }

    /// Closes every tool server session.
    pub async fn shutdown(&self) -> Result<(), TeardownError> {
        self.manager.close_all().await
    }

    pub(crate) fn summarise(text: &str) -> String {
        const SNIPPET_LIMIT: usize = 160;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return "(empty)".to_string();
        }
        let single_line = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut result: String = single_line.chars().take(SNIPPET_LIMIT).collect();
        if single_line.chars().count() > SNIPPET_LIMIT {
            result.push('…');
        }
        result
    }
}
