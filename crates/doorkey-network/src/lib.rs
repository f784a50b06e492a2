//! Network layer for the doorkey terminal
//!
//! This crate talks to the revocation and log server without ever blocking
//! the control loop. Every network step is advanced by one poll per tick.
//!
//! # Components
//!
//! - **Transport**: poll-style byte stream, with a tokio-backed [`TcpTransport`]
//!   and a scripted mock for tests
//! - **Exchange**: one HTTP/1.0 request/response cycle with bounded connect
//!   retries and a per-step timeout
//! - **RevocationClient**: polls for pending revocations and deletes the
//!   matching credential
//! - **ReportClient**: queues access and revocation logging requests
//!
//! # Example
//!
//! ```no_run
//! use doorkey_network::{RevocationClient, ServerConfig, TcpTransport};
//! use doorkey_storage::{CredentialStore, MemoryBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::new("192.168.1.10");
//! let transport = TcpTransport::new(config.socket_addr()?);
//! let mut client = RevocationClient::new(transport, &config, "secret");
//! let mut store = CredentialStore::open(MemoryBackend::default())?;
//!
//! let mut interval = tokio::time::interval(std::time::Duration::from_millis(100));
//! loop {
//!     interval.tick().await;
//!     if let Some(event) = client.tick(&mut store) {
//!         println!("{event:?}");
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod exchange;
pub mod mock;
pub mod parser;
pub mod report;
pub mod revocation;
pub mod transport;

pub use config::ServerConfig;
pub use error::{TransportError, TransportResult};
pub use exchange::{Exchange, ExchangeLimits, ExchangeStatus};
pub use parser::{ParserState, PollResponse, RevocationParser};
pub use report::{Report, ReportClient, ReportKind, ReportOutcome, ReportSecrets};
pub use revocation::{RevocationClient, RevocationEvent};
pub use transport::{TcpTransport, Transport};
