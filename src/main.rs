//! Binary entry point
//!
//! Connects the configured tool servers, then answers a one-shot query or
//! starts the interactive loop.

use clap::Parser;
use mcp_toolbridge::{Cli, run};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    run(Cli::parse()).await
}
