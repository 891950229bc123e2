//! Transports carrying JSON-RPC messages to tool servers.
//!
//! A [`Transport`] is a write half ([`MessageSink`]) plus a channel of
//! inbound messages fed by a background reader task. The session layer on
//! top does not care whether the bytes travel over a child's pipes or a
//! socket.

use super::error::ConnectionError;
use crate::config::{ServerConfig, ServerTransport};
use async_trait::async_trait;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Write half of a transport.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Sends one complete JSON-RPC message.
    async fn send(&self, message: String) -> io::Result<()>;

    /// Releases the underlying connection or process.
    async fn close(&self) -> io::Result<()>;
}

pub struct Transport {
    pub(super) sink: Box<dyn MessageSink>,
    pub(super) inbound: mpsc::UnboundedReceiver<String>,
}

impl Transport {
    pub fn new(sink: impl MessageSink + 'static, inbound: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            sink: Box::new(sink),
            inbound,
        }
    }

    pub(super) async fn open(server: &ServerConfig) -> Result<Self, ConnectionError> {
        match &server.transport {
            ServerTransport::Stdio {
                command,
                args,
                env,
                workdir,
            } => spawn_process(&server.name, command, args, env, workdir.as_deref()),
            ServerTransport::WebSocket { url } => connect_websocket(&server.name, url).await,
        }
    }
}

fn spawn_process(
    server: &str,
    program: &Path,
    args: &[String],
    env: &HashMap<String, String>,
    workdir: Option<&Path>,
) -> Result<Transport, ConnectionError> {
    let mut command = Command::new(program);
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .args(args)
        .envs(env);
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }

    let spawn_error = |source| ConnectionError::Spawn {
        server: server.to_string(),
        source,
    };
    let mut child = command.spawn().map_err(spawn_error)?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| spawn_error(io::Error::other("failed to capture server stdin")))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| spawn_error(io::Error::other("failed to capture server stdout")))?;
    info!(server, program = %program.display(), "Spawned MCP server process");

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(pump_stdout(server.to_string(), stdout, tx));

    Ok(Transport::new(
        ProcessSink {
            server: server.to_string(),
            writer: AsyncMutex::new(Some(BufWriter::new(stdin))),
            child: AsyncMutex::new(Some(child)),
        },
        rx,
    ))
}

async fn pump_stdout(server: String, stdout: ChildStdout, tx: mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(raw)) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.starts_with('\u{1b}') {
                    debug!(server = %server, line = trimmed, "skipping ANSI log line from MCP server");
                    continue;
                }
                if tx.send(raw).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(server = %server, %err, "failed to read from MCP server stdout");
                break;
            }
        }
    }
    debug!(server = %server, "MCP server stdout closed");
}

struct ProcessSink {
    server: String,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
    child: AsyncMutex<Option<Child>>,
}

#[async_trait]
impl MessageSink for ProcessSink {
    async fn send(&self, message: String) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "server stdin closed"))?;
        stream.write_all(message.as_bytes()).await?;
        stream.write_all(b"\n").await?;
        stream.flush().await
    }

    async fn close(&self) -> io::Result<()> {
        self.writer.lock().await.take();

        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };
        if let Ok(Some(status)) = child.try_wait() {
            debug!(server = %self.server, %status, "MCP server already exited");
            return Ok(());
        }
        child.kill().await?;
        debug!(server = %self.server, "MCP server process terminated");
        Ok(())
    }
}

type WebSocketWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

async fn connect_websocket(server: &str, url: &str) -> Result<Transport, ConnectionError> {
    let (stream, _response) =
        tokio_tungstenite::connect_async(url)
            .await
            .map_err(|err| ConnectionError::Connect {
                server: server.to_string(),
                url: url.to_string(),
                message: err.to_string(),
            })?;
    info!(server, url, "Connected to MCP server over WebSocket");

    let (writer, mut reader) = stream.split();
    let (tx, rx) = mpsc::unbounded_channel();
    let name = server.to_string();
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                frame = reader.next() => frame,
                () = tx.closed() => break,
            };
            let Some(frame) = frame else {
                break;
            };
            let text = match frame {
                Ok(Message::Text(text)) => text.as_str().to_owned(),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(server = %name, %err, "dropping non UTF-8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(err) => {
                    warn!(server = %name, %err, "WebSocket read failed");
                    break;
                }
            };
            if tx.send(text).is_err() {
                break;
            }
        }
        debug!(server = %name, "WebSocket stream closed");
    });

    Ok(Transport::new(
        WebSocketSink {
            writer: AsyncMutex::new(writer),
        },
        rx,
    ))
}

struct WebSocketSink {
    writer: AsyncMutex<WebSocketWriter>,
}

#[async_trait]
impl MessageSink for WebSocketSink {
    async fn send(&self, message: String) -> io::Result<()> {
        self.writer
            .lock()
            .await
            .send(Message::Text(message.into()))
            .await
            .map_err(io::Error::other)
    }

    async fn close(&self) -> io::Result<()> {
        self.writer.lock().await.close().await.map_err(io::Error::other)
    }
}
