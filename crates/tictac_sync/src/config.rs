//! Client configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tictac_board::Player;
use tracing::{debug, info, instrument};

/// What the poller does when requests keep failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Keep polling every tick for as long as it is the opponent's turn.
    #[default]
    Forever,
    /// Stop polling after this many consecutive failures, until the next reset.
    GiveUpAfter(u32),
}

/// Configuration for one game client.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ClientConfig {
    /// Game server address (`host:port`).
    #[serde(default = "default_server_addr")]
    server_addr: String,

    /// Symbol this client plays.
    #[serde(default = "default_local_player")]
    local_player: Player,

    /// Period between polls for the opponent's move.
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,

    /// Delay before the first poll.
    #[serde(default = "default_initial_delay_ms")]
    initial_delay_ms: u64,

    /// Per-request timeout; 0 disables it.
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,

    /// Consecutive failed requests before the observer hears about it.
    #[serde(default = "default_trouble_threshold")]
    trouble_threshold: u32,

    /// Retry behaviour for failed polls.
    #[serde(default)]
    retry: RetryPolicy,

    /// Reopen a closed connection on the next request.
    #[serde(default)]
    reconnect: bool,
}

fn default_server_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_local_player() -> Player {
    Player::One
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_initial_delay_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_trouble_threshold() -> u32 {
    5
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: default_server_addr(),
            local_player: default_local_player(),
            poll_interval_ms: default_poll_interval_ms(),
            initial_delay_ms: default_initial_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            trouble_threshold: default_trouble_threshold(),
            retry: RetryPolicy::default(),
            reconnect: false,
        }
    }
}

impl ClientConfig {
    /// Loads configuration from a TOML file. Missing keys take their defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(server_addr = %config.server_addr, local_player = %config.local_player, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to serialize config: {}", e)))
    }

    /// Checks values that would stall or spin the poller.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::new("poll_interval_ms must be positive".to_string()));
        }
        if self.retry == RetryPolicy::GiveUpAfter(0) {
            return Err(ConfigError::new("give_up_after must be positive".to_string()));
        }
        Ok(())
    }

    /// Poll period.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay before the first poll.
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Per-request timeout, if enabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
