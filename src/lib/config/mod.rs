pub mod app;
pub mod defaults;
pub mod error;
pub mod loader;
pub mod provider;
pub mod server;

pub use app::AppConfig;
pub use error::ConfigError;
pub use provider::{ModelProviderConfig, ProviderBackend};
pub use server::{ServerConfig, ServerTransport};
