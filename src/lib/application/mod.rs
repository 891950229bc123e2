//! # Application Module
//!
//! Core logic of the tool bridge.
//!
//! ## Submodules
//!
//! - [`catalog`] - Schema translation and the tool catalog offered to the model
//! - [`tooling`] - Sessions with MCP tool servers and their lifecycle
//! - [`conversation`] - Turn history threaded into every model call
//! - [`agent`] - The query resolution loop
//! - [`client`] - Conversation context tying the pieces together
//! - [`stdio`] - Interactive command-line loop

pub mod agent;
pub mod catalog;
pub mod client;
pub mod conversation;
pub mod stdio;
pub mod tooling;
