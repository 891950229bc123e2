use super::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub transport: ServerTransport,
}

/// How to reach a tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerTransport {
    /// Child process speaking newline-delimited JSON-RPC over stdin/stdout.
    Stdio {
        command: PathBuf,
        args: Vec<String>,
        env: HashMap<String, String>,
        workdir: Option<PathBuf>,
    },
    /// WebSocket endpoint carrying one JSON-RPC message per text frame.
    WebSocket { url: String },
}

impl ServerConfig {
    pub fn stdio(name: impl Into<String>, command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: ServerTransport::Stdio {
                command: command.into(),
                args,
                env: HashMap::new(),
                workdir: None,
            },
        }
    }

    pub fn websocket(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: ServerTransport::WebSocket { url: url.into() },
        }
    }

    /// Builds a stdio server from a bare script path, picking the interpreter
    /// from the extension: `python` for `.py`, `node` for `.js`.
    pub fn from_script(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let interpreter = match path.extension().and_then(|ext| ext.to_str()) {
            Some("py") => "python",
            Some("js") => "node",
            _ => {
                return Err(ConfigError::UnsupportedScript {
                    path: path.to_path_buf(),
                });
            }
        };
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("server")
            .to_string();
        let script = expand(&path.to_string_lossy());
        Ok(Self::stdio(name, interpreter, vec![script]))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawServer {
    name: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    workdir: Option<String>,
}

fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl TryFrom<RawServer> for ServerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawServer) -> Result<Self, Self::Error> {
        let transport = match (raw.command, raw.url) {
            (Some(command), None) => ServerTransport::Stdio {
                command: PathBuf::from(expand(&command)),
                args: raw.args.iter().map(|arg| expand(arg)).collect(),
                env: raw.env,
                workdir: raw.workdir.map(|dir| PathBuf::from(expand(&dir))),
            },
            (None, Some(url)) => {
                let url = expand(&url);
                if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                    return Err(ConfigError::InvalidServer {
                        server: raw.name,
                        reason: format!("url '{url}' must use ws:// or wss://"),
                    });
                }
                ServerTransport::WebSocket { url }
            }
            (Some(_), Some(_)) => {
                return Err(ConfigError::InvalidServer {
                    server: raw.name,
                    reason: "set either 'command' or 'url', not both".to_string(),
                });
            }
            (None, None) => {
                return Err(ConfigError::InvalidServer {
                    server: raw.name,
                    reason: "one of 'command' or 'url' is required".to_string(),
                });
            }
        };

        Ok(Self {
            name: raw.name,
            transport,
        })
    }
}
