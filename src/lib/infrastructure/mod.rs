//! Adapters to external services.

pub mod model;
