//! tictac - networked tic-tac-toe client.

mod cli;
mod console;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use console::ConsoleView;
use std::path::Path;
use tictac_sync::{ClientConfig, Player, SocketTransport, shared};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Play {
            config,
            server,
            player,
            poll_interval_ms,
            log_file,
        } => {
            initialize_tracing(&log_file)?;
            let config = load_config(&config, server, player, poll_interval_ms)?;
            run_play(config).await
        }
        Command::Config { config } => {
            let config = load_config(&config, None, None, None)?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Connect, play until the user quits, then shut the synchronizer down.
#[instrument(skip_all, fields(server = %config.server_addr()))]
async fn run_play(config: ClientConfig) -> Result<()> {
    info!("Connecting to game server");
    let transport = SocketTransport::connect(
        config.server_addr().as_str(),
        config.request_timeout(),
        *config.reconnect(),
    )
    .await
    .with_context(|| format!("Failed to connect to {}", config.server_addr()))?;

    let handle = tictac_sync::spawn(&config, shared(transport), ConsoleView)?;
    let result = console::run(&handle).await;
    handle.shutdown().await;
    info!("Client exiting");
    result
}

#[instrument(skip(server, player, poll_interval_ms))]
fn load_config(
    path: &Path,
    server: Option<String>,
    player: Option<Player>,
    poll_interval_ms: Option<u64>,
) -> Result<ClientConfig> {
    let mut config = if path.exists() {
        ClientConfig::from_file(path)?
    } else {
        info!("Config file not found at {}, using defaults", path.display());
        ClientConfig::default()
    };

    if let Some(server) = server {
        config = config.with_server_addr(server);
    }
    if let Some(player) = player {
        config = config.with_local_player(player);
    }
    if let Some(ms) = poll_interval_ms {
        config = config.with_poll_interval_ms(ms);
    }
    config.validate()?;
    Ok(config)
}

/// Logs go to a file so they don't interleave with the board on stdout.
fn initialize_tracing(log_file: &Path) -> Result<()> {
    let file = std::fs::File::create(log_file)
        .with_context(|| format!("Failed to create log file {}", log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tictac_sync=debug")),
        )
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
