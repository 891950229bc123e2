//! # Agent Module
//!
//! The query resolution loop. A query is appended to the conversation and
//! sent to the model with the current tool catalog; a function call is
//! dispatched through the tool servers and its result appended, and the
//! loop repeats until the model answers in text.
//!
//! ## Key Types
//!
//! - [`QueryResolver`] - The resolution loop
//! - [`ResolverOptions`] - Model, system prompt and tool budget
//! - [`Resolution`] - Final answer with its tool trace
//! - [`ResolveError`] - Failures that abort a query
//! - [`ToolError`] - Failures of a single dispatch, recorded as turns

mod errors;
mod models;
mod runner;
mod runtime;


pub use errors::{ResolveError, ToolError};
pub use models::{AgentStep, Resolution, ResolverOptions};
pub use runner::QueryResolver;
