//! Error types for terminal peripherals.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while sampling inputs or driving outputs.
///
/// A token with a bad checksum is not an error: readers report it as no
/// token present.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Device is not connected or its control channel has closed.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Invalid data received from device.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}
