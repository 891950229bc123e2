use thiserror::Error;

/// Failures of a single request on an established session.
#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("MCP server '{server}' is not connected")]
    NotConfigured { server: String },
    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("MCP server '{server}' returned invalid JSON: {source}")]
    InvalidJson {
        server: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' terminated unexpectedly")]
    Terminated { server: String },
    #[error("MCP server '{server}' request cancelled")]
    Cancelled { server: String },
    #[error("MCP server '{server}' did not answer '{method}' within {seconds}s")]
    Timeout {
        server: String,
        method: String,
        seconds: u64,
    },
    #[error("session with MCP server '{server}' is closed")]
    Closed { server: String },
}

/// Failures establishing a session. Fatal to that one endpoint only.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to MCP server '{server}' at {url}: {message}")]
    Connect {
        server: String,
        url: String,
        message: String,
    },
    #[error("initialization handshake with MCP server '{server}' failed: {source}")]
    Handshake {
        server: String,
        #[source]
        source: ToolInvokeError,
    },
    #[error("an MCP server named '{server}' is already connected")]
    Duplicate { server: String },
}

impl ConnectionError {
    pub fn server(&self) -> &str {
        match self {
            ConnectionError::Spawn { server, .. }
            | ConnectionError::Connect { server, .. }
            | ConnectionError::Handshake { server, .. }
            | ConnectionError::Duplicate { server } => server,
        }
    }
}

/// Raised by `close_all` after every session has been given its close attempt.
#[derive(Debug, Error)]
#[error("failed to close {} MCP session(s): {}", failures.len(), summarize(failures))]
pub struct TeardownError {
    pub failures: Vec<ToolInvokeError>,
}

fn summarize(failures: &[ToolInvokeError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
