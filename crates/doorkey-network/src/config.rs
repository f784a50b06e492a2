use crate::error::{TransportError, TransportResult};
use crate::exchange::ExchangeLimits;
use doorkey_core::constants::{
    DEFAULT_CONNECT_ATTEMPTS, DEFAULT_POLL_INTERVAL_TICKS, DEFAULT_SERVER_PORT,
    DEFAULT_STEP_TIMEOUT_TICKS, REVOCATION_POLL_PATH,
};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};

/// Revocation and log server settings
///
/// # Example
///
/// ```
/// use doorkey_network::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1:8080").poll_interval_ticks(50);
/// assert_eq!(config.socket_addr().unwrap().port(), 8080);
/// assert_eq!(config.connect_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host, with optional `:port` (default port 80)
    pub address: String,

    /// Ticks between two revocation polls
    pub poll_interval_ticks: u32,

    /// Connection attempts per exchange
    pub connect_attempts: u8,

    /// Ticks an exchange step may make no progress before it times out
    pub step_timeout_ticks: u32,

    /// Resource polled for pending revocations
    pub poll_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{DEFAULT_SERVER_PORT}"),
            poll_interval_ticks: DEFAULT_POLL_INTERVAL_TICKS,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            step_timeout_ticks: DEFAULT_STEP_TIMEOUT_TICKS,
            poll_path: REVOCATION_POLL_PATH.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn poll_interval_ticks(mut self, ticks: u32) -> Self {
        self.poll_interval_ticks = ticks;
        self
    }

    pub fn connect_attempts(mut self, attempts: u8) -> Self {
        self.connect_attempts = attempts;
        self
    }

    pub fn step_timeout_ticks(mut self, ticks: u32) -> Self {
        self.step_timeout_ticks = ticks;
        self
    }

    /// Limits applied to every exchange with this server.
    pub fn exchange_limits(&self) -> ExchangeLimits {
        ExchangeLimits {
            connect_attempts: self.connect_attempts.max(1),
            step_timeout_ticks: self.step_timeout_ticks,
        }
    }

    /// Resolve the configured address.
    ///
    /// Resolution may block on DNS, so it is done once at startup.
    pub fn socket_addr(&self) -> TransportResult<SocketAddr> {
        let with_port = if self.address.contains(':') {
            self.address.clone()
        } else {
            format!("{}:{DEFAULT_SERVER_PORT}", self.address)
        };

        with_port
            .to_socket_addrs()
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {e}", self.address)))?
            .next()
            .ok_or_else(|| TransportError::InvalidAddress(self.address.clone()))
    }
}
