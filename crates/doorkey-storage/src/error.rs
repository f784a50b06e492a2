use doorkey_core::TokenAddress;
use thiserror::Error;

/// Storage-specific error types for the credential store.
///
/// `NotFound` and `StoreFull` are expected outcomes of operator workflows
/// and are shown on the indicator; the remaining variants indicate a
/// problem with the non-volatile medium or its configuration.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No occupied slot holds the address
    #[error("Credential not found: {address}")]
    NotFound { address: TokenAddress },

    /// Every slot is occupied
    #[error("Credential store full ({capacity} slots)")]
    StoreFull { capacity: usize },

    /// Access outside the backing image
    #[error("Access out of bounds: {len} bytes at offset {offset} (image is {size} bytes)")]
    OutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// Backing file could not be read, written or synced
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
