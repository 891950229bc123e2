use crate::client::McpClient;
use crate::model::ModelProvider;
use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
}

enum LoopControl {
    Continue,
    Exit,
}

/// Interactive loop on the process's stdin and stdout.
pub async fn run<P: ModelProvider>(
    client: &McpClient<P>,
    quit_command: &str,
) -> Result<(), StdioError> {
    let stdin = BufReader::new(io::stdin());
    let mut stdout = io::stdout();
    run_with_io(client, quit_command, stdin, &mut stdout).await
}

/// Reads one query per line until end of input, `/exit` or `quit_command`.
/// A failed query is reported and the loop keeps going.
pub async fn run_with_io<P, R, W>(
    client: &McpClient<P>,
    quit_command: &str,
    input: R,
    output: &mut W,
) -> Result<(), StdioError>
where
    P: ModelProvider,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    print_banner(output, client, quit_command).await?;

    loop {
        output.write_all(b"\nQuery: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            write_line(output, "\nInput closed. Leaving interactive mode.").await?;
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case(quit_command) {
            info!("Quit sentinel received");
            break;
        }

        if matches!(input.chars().next(), Some('/') | Some(':')) {
            match handle_command(input, client, output).await? {
                LoopControl::Continue => continue,
                LoopControl::Exit => break,
            }
        } else {
            handle_query(client, input, output).await?;
        }
    }

    output.flush().await?;
    Ok(())
}

async fn handle_command<P, W>(
    input: &str,
    client: &McpClient<P>,
    output: &mut W,
) -> Result<LoopControl, StdioError>
where
    P: ModelProvider,
    W: AsyncWrite + Unpin,
{
    let command = input.trim_start_matches(['/', ':']);
    let name = command
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    debug!(command = %name, "Processing interactive command");

    match name.as_str() {
        "" => Ok(LoopControl::Continue),
        "help" | "?" => {
            print_help(output).await?;
            Ok(LoopControl::Continue)
        }
        "exit" | "quit" | "q" => Ok(LoopControl::Exit),
        "reset" | "clear" => {
            client.reset().await;
            write_line(output, "Conversation history cleared.").await?;
            Ok(LoopControl::Continue)
        }
        "tools" => {
            print_tools(output, client).await?;
            Ok(LoopControl::Continue)
        }
        other => {
            write_line(
                output,
                &format!("Unknown command '{other}'. Use /help for the list of commands."),
            )
            .await?;
            Ok(LoopControl::Continue)
        }
    }
}

async fn handle_query<P, W>(client: &McpClient<P>, query: &str, output: &mut W) -> Result<(), StdioError>
where
    P: ModelProvider,
    W: AsyncWrite + Unpin,
{
    match client.ask(query).await {
        Ok(resolution) => {
            write_line(output, "").await?;
            write_line(output, &resolution.render()).await?;
        }
        Err(err) => {
            error!(%err, "Query failed");
            write_line(output, "\nRequest failed:").await?;
            write_line(output, &err.user_message()).await?;
        }
    }
    output.flush().await?;
    Ok(())
}

async fn print_banner<P, W>(
    output: &mut W,
    client: &McpClient<P>,
    quit_command: &str,
) -> Result<(), StdioError>
where
    P: ModelProvider,
    W: AsyncWrite + Unpin,
{
    let servers = client.servers().await;
    let tools = client.catalog().await.len();
    write_line(output, "MCP Tool Bridge").await?;
    write_line(
        output,
        &format!(
            "Model: {} | Servers: {} | Tools: {tools}",
            client.model(),
            if servers.is_empty() {
                "none".to_string()
            } else {
                servers.join(", ")
            }
        ),
    )
    .await?;
    write_line(
        output,
        &format!("Type your queries, '{quit_command}' to exit, or /help for commands."),
    )
    .await
}

async fn print_help<W: AsyncWrite + Unpin>(output: &mut W) -> Result<(), StdioError> {
    write_line(output, "Commands:").await?;
    write_line(output, "  /help   Show this help").await?;
    write_line(output, "  /tools  List the tools offered to the model").await?;
    write_line(output, "  /reset  Forget the conversation so far").await?;
    write_line(output, "  /exit   Leave interactive mode").await
}

async fn print_tools<P, W>(output: &mut W, client: &McpClient<P>) -> Result<(), StdioError>
where
    P: ModelProvider,
    W: AsyncWrite + Unpin,
{
    let catalog = client.catalog().await;
    if catalog.is_empty() {
        return write_line(output, "No tools available.").await;
    }
    write_line(output, &format!("{} tool(s):", catalog.len())).await?;
    for entry in catalog.entries() {
        let descriptor = &entry.descriptor;
        let server = descriptor.server.as_deref().unwrap_or("-");
        let line = if descriptor.description.is_empty() {
            format!("  {} [{server}]", descriptor.name)
        } else {
            format!("  {} [{server}] - {}", descriptor.name, descriptor.description)
        };
        write_line(output, &line).await?;
    }
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<(), StdioError> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ResolverOptions;
    use crate::model::{ModelError, ModelReply, ModelRequest};
    use crate::tooling::ServerManager;
    use crate::types::ConversationTurn;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct Parrot;

    #[async_trait]
    impl ModelProvider for Parrot {
        fn id(&self) -> &str {
            "parrot"
        }

        async fn generate(&self, request: ModelRequest) -> Result<ModelReply, ModelError> {
            match request.turns.last() {
                Some(ConversationTurn::UserText(text)) if text == "boom" => {
                    Err(ModelError::invalid_response("parrot", "exploded"))
                }
                Some(ConversationTurn::UserText(text)) => Ok(ModelReply::FinalAnswer {
                    text: format!("you said {text}"),
                }),
                _ => Err(ModelError::invalid_response("parrot", "no user turn")),
            }
        }
    }

    fn client() -> McpClient<Parrot> {
        McpClient::new(
            Parrot,
            Arc::new(ServerManager::new(Duration::from_secs(1))),
            ResolverOptions::new("parrot-1"),
        )
    }

    async fn transcript(script: &str) -> String {
        let client = client();
        let mut output = Vec::new();
        run_with_io(&client, "quit", script.as_bytes(), &mut output)
            .await
            .expect("loop runs");
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn answers_queries_until_quit_sentinel() {
        let out = transcript("hello\nquit\nnever asked\n").await;

        assert!(out.contains("you said hello"));
        assert!(!out.contains("never asked"));
        assert!(!out.contains("Input closed"));
    }

    #[tokio::test]
    async fn failures_are_reported_and_loop_continues() {
        let out = transcript("boom\nstill here\n").await;

        assert!(out.contains("Request failed:"));
        assert!(out.contains("could not be understood"));
        assert!(out.contains("you said still here"));
        assert!(out.contains("Input closed"));
    }

    #[tokio::test]
    async fn commands_are_handled_locally() {
        let out = transcript("/help\n/tools\n/reset\n/bogus\n/exit\nhello\n").await;

        assert!(out.contains("/tools  List the tools"));
        assert!(out.contains("No tools available."));
        assert!(out.contains("Conversation history cleared."));
        assert!(out.contains("Unknown command 'bogus'"));
        assert!(!out.contains("you said hello"));
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let client = client();
        let mut output = Vec::new();
        run_with_io(&client, "quit", "one\ntwo\n/reset\n".as_bytes(), &mut output)
            .await
            .unwrap();
        assert_eq!(client.history_len().await, 0);
    }
}
