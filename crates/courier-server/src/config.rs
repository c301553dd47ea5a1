//! Server configuration.
//!
//! Values are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. `COURIER_*` environment variables
//! 3. command line flags
//!
//! # Environment Variables
//!
//! - `COURIER_PORT`: listen port. Default: `8080`
//! - `COURIER_STATIC_DIR`: directory served at the web root. Default: `./static`
//! - `COURIER_OUTBOUND_BUFFER`: frames queued per connection. Default: `256`
//! - `COURIER_EVENT_QUEUE`: hub event queue capacity. Default: `256`
//! - `COURIER_SESSION_KEY_BITS`: RSA modulus for per-connection keys. Default: `2048`

use std::path::PathBuf;

use clap::Parser;
use courier_crypto::DEFAULT_KEY_BITS;
use courier_hub::hub::DEFAULT_EVENT_QUEUE;
use courier_hub::HubConfig;
use serde::Deserialize;
use tracing::info;

use crate::session::{SessionSettings, DEFAULT_OUTBOUND_BUFFER};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "COURIER";

/// Courier relay server
#[derive(Debug, Default, Parser)]
#[command(name = "courier-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Server port [default: 8080]
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory served at the web root [default: ./static]
    #[arg(long)]
    pub static_dir: Option<PathBuf>,
}

/// Effective server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port on all interfaces
    pub port: u16,
    /// Directory served at the web root
    pub static_dir: PathBuf,
    /// Frames queued per connection before a slow peer starts losing frames
    pub outbound_buffer: usize,
    /// Hub event queue capacity
    pub event_queue: usize,
    /// RSA modulus size for per-connection server keys
    pub session_key_bits: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: PathBuf::from("./static"),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            event_queue: DEFAULT_EVENT_QUEUE,
            session_key_bits: DEFAULT_KEY_BITS,
        }
    }
}

impl ServerConfig {
    /// Load defaults, then the environment, then the command line.
    pub fn load(cli: &Cli) -> Result<Self, config::ConfigError> {
        let mut config = Self::from_env()?;
        config.apply_cli(cli);
        Ok(config)
    }

    /// Load defaults overridden by `COURIER_*` environment variables.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: config::Environment) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Command line flags override everything else.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(static_dir) = &cli.static_dir {
            self.static_dir = static_dir.clone();
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            event_queue: self.event_queue,
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            outbound_buffer: self.outbound_buffer,
            key_bits: self.session_key_bits,
        }
    }

    /// Log the effective configuration.
    pub fn log_config(&self) {
        info!("Port: {}", self.port);
        info!("Static directory: {}", self.static_dir.display());
        info!(
            outbound_buffer = self.outbound_buffer,
            event_queue = self.event_queue,
            session_key_bits = self.session_key_bits,
            "Relay limits"
        );
    }
}
