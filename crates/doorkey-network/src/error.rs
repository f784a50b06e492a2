use thiserror::Error;

/// Errors that can occur while exchanging a request with the server
#[derive(Debug, Error)]
pub enum TransportError {
    /// Operation needs an established connection
    #[error("Not connected to server")]
    NotConnected,

    /// Server refused or the connection could not be set up
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// A step made no progress within its tick budget
    #[error("Connection timeout after {0} ticks")]
    ConnectionTimeout(u32),

    /// Connection was lost during operation
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Server address could not be resolved
    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
