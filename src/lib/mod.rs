pub mod application;
pub mod cli;
pub mod config;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{agent, catalog, client, conversation, stdio, tooling};
pub use cli::Cli;
pub use config::{AppConfig, ModelProviderConfig, ServerConfig};
pub use domain::types;
pub use infrastructure::model;

use agent::ResolverOptions;
use client::McpClient;
use config::ConfigError;
use model::{ModelProvider, ProviderFactory};
use std::error::Error;
use std::sync::Arc;
use tokio::signal;
use tooling::ServerManager;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// Runs the client. Every session opened here is closed before returning,
/// whether the run ends normally, on Ctrl-C or with an error.
pub async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting mcp-toolbridge");
    debug!(
        config = ?cli.config,
        provider = ?cli.provider,
        model = ?cli.model,
        servers = cli.servers.len(),
        "CLI arguments parsed"
    );

    let mut config = AppConfig::load(cli.config.as_deref())?;
    match &cli.config {
        Some(path) => info!(path = %path.display(), "Loaded configuration from file"),
        None => info!("Loaded configuration from default path"),
    }
    apply_cli_overrides(&cli, &mut config)?;

    let provider = ProviderFactory::create(config.active_provider()?, config.model_timeout)?;
    let manager = Arc::new(ServerManager::new(config.tool_timeout));
    let options = ResolverOptions::new(config.model.clone())
        .with_system_prompt(config.system_prompt.clone())
        .with_max_tool_turns(config.max_tool_turns);
    let client = McpClient::new(provider, Arc::clone(&manager), options);

    let outcome = tokio::select! {
        result = drive(&cli, &config, &manager, &client) => result,
        signal = signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Interrupted; shutting down"),
                Err(err) => error!(%err, "Failed to listen for Ctrl-C; shutting down"),
            }
            Ok(())
        }
    };

    let teardown = client.shutdown().await;
    match (outcome, teardown) {
        (Ok(()), Ok(())) => {
            info!("Client execution finished");
            Ok(())
        }
        (Ok(()), Err(err)) => Err(err.into()),
        (Err(err), teardown) => {
            if let Err(teardown) = teardown {
                warn!(%teardown, "Teardown also failed");
            }
            Err(err)
        }
    }
}

async fn drive<P: ModelProvider>(
    cli: &Cli,
    config: &AppConfig,
    manager: &ServerManager,
    client: &McpClient<P>,
) -> Result<(), Box<dyn Error>> {
    let failures = manager.connect_all(&config.servers).await;
    if !config.servers.is_empty() && failures.len() == config.servers.len() {
        warn!("No tool server could be connected; continuing without tools");
    }
    info!(
        connected = config.servers.len() - failures.len(),
        failed = failures.len(),
        "Tool servers ready"
    );

    match cli.one_shot_query() {
        Some(query) => {
            let resolution = client.ask(&query).await?;
            println!("{}", resolution.render());
        }
        None => {
            info!("Launching interactive loop");
            stdio::run(client, &config.quit_command).await?;
        }
    }
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr)
            .init();
    });
}

/// Folds command-line flags into the loaded configuration.
fn apply_cli_overrides(cli: &Cli, config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(provider) = &cli.provider {
        info!(provider = %provider, "Overriding default provider from CLI flag");
        config.default_provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        info!(model = %model, "Overriding model from CLI flag");
        config.model = model.clone();
    }
    if let Some(system) = &cli.system {
        config.system_prompt = Some(system.clone());
    }
    if let Some(limit) = cli.max_tool_turns {
        config.max_tool_turns = limit;
    }
    for script in &cli.servers {
        let server = ServerConfig::from_script(script)?;
        debug!(server = %server.name, "Adding tool server from CLI flag");
        config.servers.push(server);
    }

    config.active_provider()?;
    Ok(())
}
