//! Model traits

use super::types::{ModelError, ModelReply, ModelRequest};
use async_trait::async_trait;

/// A model backend able to answer with text or a single function call.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Identifier of the configured provider, used in logs and errors.
    fn id(&self) -> &str;

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ModelError>;
}

#[async_trait]
impl<P: ModelProvider + ?Sized> ModelProvider for Box<P> {
    fn id(&self) -> &str {
        (**self).id()
    }

    async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
        (**self).generate(request).await
    }
}
