//! Command line and terminal configuration.

use anyhow::Context;
use clap::{Parser, Subcommand};
use doorkey_auth::AuthTimings;
use doorkey_core::TokenAddress;
use doorkey_core::constants::{DEFAULT_TICK_MS, SLOT_SIZE};
use doorkey_network::ServerConfig;
use doorkey_storage::StoreConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(name = "doorkey", version, about = "Token access-control terminal")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store image path, overriding the configuration file
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the terminal loop, reading operator input from stdin
    Run {
        /// Keep credentials in memory instead of the store image
        #[arg(long)]
        in_memory: bool,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        /// Revocation server address, overriding the configuration file
        #[arg(long)]
        server: Option<String>,
    },

    /// Remove every credential from the store
    Erase,

    /// Erase the store and enroll a single administrator
    Provision {
        /// Administrator token address (16 hex digits)
        address: TokenAddress,
    },

    /// List enrolled credentials
    Dump,

    /// Print the server-side hash of a token address
    Hash {
        /// Token address (16 hex digits)
        address: TokenAddress,

        /// Use the access-log secret instead of the revocation secret
        #[arg(long)]
        access: bool,
    },
}

/// Terminal configuration, as loaded from `--config`.
///
/// Every section is optional; missing fields take their defaults.
///
/// ```json
/// {
///   "store": { "path": "/var/lib/doorkey/keys.img", "size": 1024 },
///   "timings": { "door_open": 10 },
///   "server": { "address": "192.168.1.10", "poll_interval_ticks": 600 },
///   "revocation_secret": "some very long sentence"
/// }
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub store: StoreConfig,
    pub timings: AuthTimings,

    /// Revocation and log server; network features are off when absent
    pub server: Option<ServerConfig>,

    /// Secret prefixed to addresses in access-log hashes
    pub access_secret: String,

    /// Secret prefixed to addresses in revocation hashes
    pub revocation_secret: String,

    /// Length of one tick in milliseconds
    pub tick_ms: u64,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            timings: AuthTimings::default(),
            server: None,
            access_secret: String::new(),
            revocation_secret: String::new(),
            tick_ms: DEFAULT_TICK_MS,
        }
    }
}

impl fmt::Debug for TerminalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalConfig")
            .field("store", &self.store)
            .field("timings", &self.timings)
            .field("server", &self.server)
            .field("tick_ms", &self.tick_ms)
            .finish_non_exhaustive()
    }
}

impl TerminalConfig {
    /// Load the configuration file, or the defaults when none is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides.
    pub fn with_overrides(mut self, cli: &Cli) -> Self {
        if let Some(path) = &cli.store {
            self.store.path = path.clone();
        }
        if let Command::Run {
            server: Some(address),
            ..
        } = &cli.command
        {
            let server = self.server.take().unwrap_or_default();
            self.server = Some(ServerConfig {
                address: address.clone(),
                ..server
            });
        }
        self
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.tick_ms == 0 {
            anyhow::bail!("tick_ms must be greater than zero");
        }
        if self.store.size < SLOT_SIZE {
            anyhow::bail!("store size {} is smaller than one slot", self.store.size);
        }
        Ok(())
    }
}
