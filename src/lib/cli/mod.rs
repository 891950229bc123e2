use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "mcp-toolbridge",
    version,
    about = "Lets a function-calling language model use the tools of MCP servers"
)]
pub struct Cli {
    /// Path to client.toml (defaults to config/client.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Provider id to use instead of `default_provider`
    #[arg(long)]
    pub provider: Option<String>,
    /// Model name to use instead of `model`
    #[arg(long)]
    pub model: Option<String>,
    /// System prompt sent with every model call
    #[arg(long)]
    pub system: Option<String>,
    /// Maximum tool calls per query
    #[arg(long)]
    pub max_tool_turns: Option<usize>,
    /// Extra tool server script (.py or .js); may be repeated
    #[arg(long = "server", value_name = "SCRIPT")]
    pub servers: Vec<PathBuf>,
    /// Answer this query and exit instead of starting the interactive loop
    #[arg(trailing_var_arg = true)]
    pub query: Vec<String>,
}

impl Cli {
    /// The one-shot query, if any words were given.
    pub fn one_shot_query(&self) -> Option<String> {
        let joined = self.query.join(" ");
        let trimmed = joined.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}
