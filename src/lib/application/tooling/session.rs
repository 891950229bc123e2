use super::error::{ConnectionError, ToolInvokeError};
use super::transport::{MessageSink, Transport};
use crate::application::catalog::ToolDescriptor;
use crate::config::ServerConfig;
use crate::constants::PROTOCOL_VERSION;
use serde_json::{Map as JsonMap, Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of `tools/call` as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub value: Value,
    /// The server flagged the call as failed (`isError`).
    pub is_error: bool,
    pub message: Option<String>,
}

impl ToolOutput {
    pub fn success(value: Value) -> Self {
        Self {
            value,
            is_error: false,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            value: Value::String(message.clone()),
            is_error: true,
            message: Some(message),
        }
    }

    fn from_result(result: Value) -> Self {
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let message = extract_tool_message(&result);
        let value = extract_tool_value(result);
        Self {
            value,
            is_error,
            message,
        }
    }
}

/// A live, initialized connection to one tool server.
///
/// Opened once through [`McpSession::connect`] and closed once through
/// [`McpSession::close`]; later closes are no-ops and every request after
/// the first close fails with [`ToolInvokeError::Closed`].
#[derive(Clone)]
pub struct McpSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    name: String,
    sink: Box<dyn MessageSink>,
    pending: AsyncMutex<HashMap<String, oneshot::Sender<Result<Value, ToolInvokeError>>>>,
    id_counter: AtomicU64,
    request_timeout: Duration,
    ready: AtomicBool,
    alive: AtomicBool,
    closed: AtomicBool,
    tools_stale: AtomicBool,
    instructions: AsyncMutex<Option<String>>,
    tools: AsyncMutex<Vec<ToolDescriptor>>,
    reader: AsyncMutex<Option<JoinHandle<()>>>,
}

impl McpSession {
    /// Establishes the transport described by `server` and runs the handshake.
    pub async fn connect(
        server: &ServerConfig,
        request_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let transport = Transport::open(server).await?;
        Self::with_transport(server.name.clone(), transport, request_timeout).await
    }

    /// Runs the handshake over an already established transport.
    pub async fn with_transport(
        name: impl Into<String>,
        transport: Transport,
        request_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let Transport { sink, inbound } = transport;
        let inner = Arc::new(SessionInner {
            name: name.into(),
            sink,
            pending: AsyncMutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
            request_timeout,
            ready: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            tools_stale: AtomicBool::new(false),
            instructions: AsyncMutex::new(None),
            tools: AsyncMutex::new(Vec::new()),
            reader: AsyncMutex::new(None),
        });

        let reader = tokio::spawn(SessionInner::reader_loop(Arc::downgrade(&inner), inbound));
        *inner.reader.lock().await = Some(reader);

        let session = Self { inner };
        if let Err(source) = session.inner.initialize().await {
            let server = session.inner.name.clone();
            if let Err(err) = session.close().await {
                debug!(server = %server, %err, "close after failed handshake also failed");
            }
            return Err(ConnectionError::Handshake { server, source });
        }
        info!(server = %session.inner.name, "MCP session initialized");
        Ok(session)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// True while the session is initialized, not closed and its transport is up.
    pub fn is_usable(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
            && self.inner.alive.load(Ordering::SeqCst)
            && !self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// The server announced that its tool list changed since the last listing.
    pub fn tools_stale(&self) -> bool {
        self.inner.tools_stale.load(Ordering::SeqCst)
    }

    pub async fn instructions(&self) -> Option<String> {
        self.inner.instructions.lock().await.clone()
    }

    /// Tools from the most recent successful listing.
    pub async fn cached_tools(&self) -> Vec<ToolDescriptor> {
        self.inner.tools.lock().await.clone()
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        self.inner.ensure_usable()?;
        self.inner.list_tools().await
    }

    pub async fn call_tool(
        &self,
        tool: &str,
        arguments: JsonMap<String, Value>,
    ) -> Result<ToolOutput, ToolInvokeError> {
        self.inner.ensure_usable()?;
        debug!(server = %self.inner.name, tool, "Sending tools/call");
        let params = json!({
            "name": tool,
            "arguments": Value::Object(arguments),
        });
        let result = self.inner.send_request("tools/call", params).await?;
        Ok(ToolOutput::from_result(result))
    }

    /// Releases the transport. Only the first call does any work.
    pub async fn close(&self) -> Result<(), ToolInvokeError> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let result = self
            .inner
            .sink
            .close()
            .await
            .map_err(|err| self.inner.transport_error(err.to_string()));

        if let Some(reader) = self.inner.reader.lock().await.take() {
            reader.abort();
        }
        self.inner
            .fail_all_pending(|server| ToolInvokeError::Closed { server })
            .await;
        self.inner.tools.lock().await.clear();
        match &result {
            Ok(()) => info!(server = %self.inner.name, "MCP session closed"),
            Err(err) => warn!(server = %self.inner.name, %err, "MCP session closed with error"),
        }
        result
    }
}

impl SessionInner {
    async fn initialize(&self) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": {}
        });
        let init_result = self.send_request("initialize", params).await?;
        if let Some(text) = init_result.get("instructions").and_then(Value::as_str) {
            *self.instructions.lock().await = Some(text.to_string());
        }
        if let Some(version) = init_result.get("protocolVersion").and_then(Value::as_str) {
            debug!(server = %self.name, version, "Server negotiated protocol version");
        }
        self.send_notification("notifications/initialized", json!({}))
            .await?;
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn ensure_usable(&self) -> Result<(), ToolInvokeError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ToolInvokeError::Closed {
                server: self.name.clone(),
            });
        }
        if !self.alive.load(Ordering::SeqCst) {
            return Err(ToolInvokeError::Terminated {
                server: self.name.clone(),
            });
        }
        if !self.ready.load(Ordering::SeqCst) {
            return Err(self.transport_error("session not initialised"));
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolInvokeError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.send_request("tools/list", params).await?;
            if let Some(array) = result.get("tools").and_then(Value::as_array) {
                tools.extend(array.iter().filter_map(|tool| self.parse_tool(tool)));
            }
            cursor = result
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(str::to_string);
            if cursor.is_none() {
                break;
            }
        }

        debug!(server = %self.name, tools = tools.len(), "Listed server tools");
        *self.tools.lock().await = tools.clone();
        self.tools_stale.store(false, Ordering::SeqCst);
        Ok(tools)
    }

    fn parse_tool(&self, tool: &Value) -> Option<ToolDescriptor> {
        let Some(name) = tool.get("name").and_then(Value::as_str) else {
            warn!(server = %self.name, "ignoring tool entry without a name");
            return None;
        };
        Some(ToolDescriptor {
            name: name.to_string(),
            description: tool
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            server: Some(self.name.clone()),
            input_schema: tool
                .get("inputSchema")
                .cloned()
                .unwrap_or_else(|| json!({ "type": "object" })),
        })
    }

    /// Holds the session weakly so that dropping every handle releases the
    /// sink, and with it the server process, even without a `close`.
    async fn reader_loop(session: Weak<Self>, mut inbound: mpsc::UnboundedReceiver<String>) {
        while let Some(raw) = inbound.recv().await {
            let Some(inner) = session.upgrade() else {
                return;
            };
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    if let Err(err) = inner.process_inbound_message(value).await {
                        warn!(server = %inner.name, %err, "failed to process message from MCP server");
                    }
                }
                Err(source) => {
                    warn!(server = %inner.name, line = raw, %source, "received invalid JSON from MCP server");
                }
            }
        }

        let Some(inner) = session.upgrade() else {
            return;
        };
        inner.alive.store(false, Ordering::SeqCst);
        if !inner.closed.load(Ordering::SeqCst) {
            warn!(server = %inner.name, "MCP server connection ended");
        }
        inner
            .fail_all_pending(|server| ToolInvokeError::Terminated { server })
            .await;
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolInvokeError> {
        match (value.get("id").cloned(), value.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, value).await,
            (Some(id), false) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, true) => {
                self.handle_notification(&value);
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let Some(key) = response_key(&id) else {
            return;
        };
        let Some(sender) = self.pending.lock().await.remove(&key) else {
            debug!(server = %self.name, response_id = key, "received response for unknown request");
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => Err(match error.as_object() {
                Some(err) => ToolInvokeError::Rpc {
                    server: self.name.clone(),
                    code: err.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                    message: err
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                },
                None => self.transport_error("missing error payload in response"),
            }),
            None => Ok(value),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match method {
            "ping" => self.send_response(id, json!({})).await,
            other => {
                warn!(server = %self.name, method = other, "server sent unsupported request");
                let error = json!({
                    "code": -32601,
                    "message": format!("client does not implement method '{other}'"),
                });
                self.send_error(id, error).await
            }
        }
    }

    fn handle_notification(&self, value: &Value) {
        let Some(method) = value.get("method").and_then(Value::as_str) else {
            return;
        };
        debug!(server = %self.name, method, "received notification from server");
        if method == "notifications/tools/list_changed" {
            self.tools_stale.store(true, Ordering::SeqCst);
        }
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let id = self.next_id();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);
        if !self.alive.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(ToolInvokeError::Terminated {
                server: self.name.clone(),
            });
        }

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(Ok(value))) => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
            Ok(Ok(Err(err))) => Err(err),
            Ok(Err(_)) => Err(ToolInvokeError::Cancelled {
                server: self.name.clone(),
            }),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(ToolInvokeError::Timeout {
                    server: self.name.clone(),
                    method: method.to_string(),
                    seconds: self.request_timeout.as_secs(),
                })
            }
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn send_response(&self, id: Value, result: Value) -> Result<(), ToolInvokeError> {
        self.write_message(&json!({ "jsonrpc": "2.0", "id": id, "result": result }))
            .await
    }

    async fn send_error(&self, id: Value, error: Value) -> Result<(), ToolInvokeError> {
        self.write_message(&json!({ "jsonrpc": "2.0", "id": id, "error": error }))
            .await
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.name.clone(),
                source,
            })?;
        self.sink
            .send(encoded)
            .await
            .map_err(|err| self.transport_error(err.to_string()))
    }

    async fn fail_all_pending(&self, error: impl Fn(String) -> ToolInvokeError) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(error(self.name.clone())));
        }
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.name.clone(),
            message: message.into(),
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.get_mut().take() {
            reader.abort();
        }
        if !self.closed.load(Ordering::SeqCst) {
            debug!(server = %self.name, "MCP session dropped without close; releasing transport");
        }
    }
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

fn extract_tool_message(result: &Value) -> Option<String> {
    if let Some(array) = result.get("content").and_then(Value::as_array) {
        for block in array {
            let is_text = block
                .get("type")
                .and_then(Value::as_str)
                .map(|kind| kind.eq_ignore_ascii_case("text"))
                .unwrap_or(false);
            if !is_text {
                continue;
            }
            if let Some(text) = block.get("text").and_then(Value::as_str) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }

    result
        .get("structuredContent")
        .and_then(|structured| structured.get("error"))
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

/// Picks the most useful representation of a tool result for the model:
/// structured content first, then the joined text blocks, then raw content.
fn extract_tool_value(mut result: Value) -> Value {
    if let Some(structured) = result
        .get_mut("structuredContent")
        .map(Value::take)
        .filter(|value| !value.is_null())
    {
        return match structured {
            // Primitive returns arrive wrapped as {"result": value}.
            Value::Object(mut map) if map.len() == 1 && map.contains_key("result") => {
                map.remove("result").unwrap_or(Value::Null)
            }
            other => other,
        };
    }

    let Some(content) = result.get_mut("content").map(Value::take) else {
        return result;
    };
    let joined = content.as_array().and_then(|blocks| {
        let texts: Vec<&str> = blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect();
        (!texts.is_empty() && texts.len() == blocks.len()).then(|| texts.join("\n"))
    });
    match joined {
        Some(text) => Value::String(text),
        None => content,
    }
}
