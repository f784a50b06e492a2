use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Bus errors
    #[error("Checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumInvalid { expected: u8, actual: u8 },

    #[error("Invalid token address: {0}")]
    InvalidAddress(String),

    #[error("Invalid indicator color bits: {0:#04x}")]
    InvalidColor(u8),

    #[error("Invalid hash: {0}")]
    InvalidHash(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
