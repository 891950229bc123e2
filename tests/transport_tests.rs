// Transport tests - real child processes and WebSocket servers speaking MCP
//
// Each test stands up a minimal tool server, connects through the manager,
// lists and calls a tool, then tears everything down.

use futures::{SinkExt, StreamExt};
use mcp_toolbridge::config::ServerConfig;
use mcp_toolbridge::tooling::{McpSession, ServerManager, ToolServerInterface};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(10);

#[cfg(unix)]
const ECHO_SERVER: &str = r#"
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed -n 's/.*"id":"\([^"]*\)".*/\1/p')
  case "$line" in
    *'"method":"initialize"'*)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"protocolVersion":"2025-06-18","capabilities":{"tools":{}},"serverInfo":{"name":"echo","version":"1.0"}}}\n' "$id" ;;
    *'"method":"tools/list"'*)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"tools":[{"name":"echo","description":"Echo text back","inputSchema":{"type":"object","properties":{"text":{"type":"string","title":"Text"}},"required":["text"]}}]}}\n' "$id" ;;
    *'"method":"tools/call"'*)
      printf '{"jsonrpc":"2.0","id":"%s","result":{"content":[{"type":"text","text":"pong"}],"isError":false}}\n' "$id" ;;
  esac
done
"#;

#[cfg(unix)]
#[tokio::test]
async fn stdio_server_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("echo_server.sh");
    std::fs::write(&script, ECHO_SERVER).expect("write script");

    let manager = ServerManager::new(TIMEOUT);
    let config = ServerConfig::stdio(
        "echo",
        "sh",
        vec![script.to_string_lossy().into_owned()],
    );
    manager.connect(&config).await.expect("server connects");

    let catalog = manager.catalog().await;
    let names: Vec<_> = catalog.names().collect();
    assert_eq!(names, vec!["echo"]);
    let declarations = catalog.translated_for_model();
    assert_eq!(
        declarations[0].parameters,
        json!({
            "type": "object",
            "properties": {"text": {"type": "string"}},
            "required": ["text"]
        })
    );

    let mut args = Map::new();
    args.insert("text".into(), json!("ping"));
    let output = manager
        .invoke_tool("echo", "echo", args)
        .await
        .expect("tool answers");
    assert_eq!(output.value, json!("pong"));
    assert!(!output.is_error);

    manager.close_all().await.expect("clean teardown");
    assert!(manager.servers().await.is_empty());
}

#[cfg(target_os = "linux")]
fn process_running(pid: &str) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // A zombie has exited; it only waits to be reaped.
    stat.rsplit(')')
        .next()
        .and_then(|rest| rest.trim_start().chars().next())
        .is_some_and(|state| state != 'Z')
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn dropped_session_stops_its_server_process() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pid_file = dir.path().join("server.pid");
    let script = dir.path().join("echo_server.sh");
    std::fs::write(
        &script,
        format!("echo $$ > '{}'\n{ECHO_SERVER}", pid_file.display()),
    )
    .expect("write script");

    let config = ServerConfig::stdio(
        "echo",
        "sh",
        vec![script.to_string_lossy().into_owned()],
    );
    let session = McpSession::connect(&config, TIMEOUT)
        .await
        .expect("server connects");
    let pid = std::fs::read_to_string(&pid_file).expect("pid written");
    let pid = pid.trim().to_string();
    assert!(process_running(&pid));

    drop(session);

    let mut running = true;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if !process_running(&pid) {
            running = false;
            break;
        }
    }
    assert!(!running, "server process {pid} outlived its session");
}

async fn serve_websocket(listener: TcpListener) {
    let Ok((stream, _)) = listener.accept().await else {
        return;
    };
    let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    while let Some(Ok(frame)) = socket.next().await {
        let Message::Text(text) = frame else {
            continue;
        };
        let request: Value = serde_json::from_str(text.as_str()).expect("client sends JSON");
        let Some(id) = request.get("id").cloned() else {
            continue;
        };
        let result = match request["method"].as_str() {
            Some("initialize") => json!({
                "protocolVersion": "2025-06-18",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "desktop", "version": "1.0"},
                "instructions": "Commands run on the host desktop."
            }),
            Some("tools/list") => json!({"tools": [{
                "name": "run_command",
                "description": "Run a shell command",
                "inputSchema": {
                    "type": "object",
                    "properties": {"command": {"type": "string"}},
                    "required": ["command"]
                }
            }]}),
            Some("tools/call") => json!({
                "content": [{"type": "text", "text": "hello from ws"}],
                "isError": false
            }),
            _ => json!({}),
        };
        let reply = json!({"jsonrpc": "2.0", "id": id, "result": result});
        if socket.send(Message::Text(reply.to_string().into())).await.is_err() {
            break;
        }
    }
}

#[tokio::test]
async fn websocket_server_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(serve_websocket(listener));

    let manager = ServerManager::new(TIMEOUT);
    let config = ServerConfig::websocket("desktop", format!("ws://{addr}"));
    manager.connect(&config).await.expect("server connects");

    assert_eq!(
        manager.instructions().await,
        vec![(
            "desktop".to_string(),
            "Commands run on the host desktop.".to_string()
        )]
    );
    let tools = manager.list_tools("desktop").await.expect("tools listed");
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].server.as_deref(), Some("desktop"));

    let mut args = Map::new();
    args.insert("command".into(), json!("echo hello"));
    let output = manager
        .call_tool("desktop", "run_command", args)
        .await
        .expect("tool answers");
    assert_eq!(output.value, json!("hello from ws"));

    manager.close_all().await.expect("clean teardown");
}

#[tokio::test]
async fn unreachable_websocket_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let manager = ServerManager::new(TIMEOUT);
    let failures = manager
        .connect_all(&[ServerConfig::websocket("gone", format!("ws://{addr}"))])
        .await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].server(), "gone");
    assert!(manager.catalog().await.is_empty());
}
