//! Model infrastructure module
//!
//! Provides the model backends behind one [`ModelProvider`] capability.
//!
//! # Structure
//! - `types` - Request, Reply, Error types
//! - `traits` - ModelProvider trait
//! - `adapter` - Conversation and tool encoders per backend format
//! - `factory` - Selects the backend for the configured provider
//! - `clients` - Individual client implementations

pub mod adapter;
pub mod clients;
pub mod factory;
pub mod traits;
pub mod types;

pub use factory::ProviderFactory;
pub use traits::ModelProvider;
pub use types::{ModelError, ModelReply, ModelRequest};
