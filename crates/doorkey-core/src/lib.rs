pub mod constants;
pub mod error;
pub mod hash;
pub mod types;

pub use error::{Error, Result};
pub use hash::{KeyHash, key_hash};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
