//! Command-line interface for the tictac client.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tictac_sync::Player;

/// tictac - play tic-tac-toe against a remote opponent through a game server
#[derive(Parser, Debug)]
#[command(name = "tictac")]
#[command(about = "Networked tic-tac-toe client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to the server and play in the terminal
    Play {
        /// Path to a TOML config file (optional; defaults apply when missing)
        #[arg(short, long, default_value = "tictac.toml")]
        config: PathBuf,

        /// Server address, overrides the config file
        #[arg(long)]
        server: Option<String>,

        /// Which player this client is (one or two), overrides the config file
        #[arg(long)]
        player: Option<Player>,

        /// Poll period in milliseconds, overrides the config file
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// File that receives log output
        #[arg(long, default_value = "tictac.log")]
        log_file: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Path to a TOML config file
        #[arg(short, long, default_value = "tictac.toml")]
        config: PathBuf,
    },
}
