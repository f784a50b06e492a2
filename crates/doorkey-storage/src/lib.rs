//! Persistent credential table for the doorkey terminal.
//!
//! This crate owns the non-volatile image holding every enrolled token
//! address and its privilege, and the rules for mutating it safely when
//! power may fail between any two byte writes.
//!
//! # Architecture
//!
//! - [`NvBackend`] - Byte-addressed, write-through medium
//! - [`MemoryBackend`], [`FileBackend`] - Volatile and file-backed images
//! - [`CredentialRepository`] - Operations the policy layers depend on
//! - [`CredentialStore`] - Slot table implementing the repository on a backend
//!
//! # Persisted Layout
//!
//! The image is an array of 9-byte slots with no header. Byte 0 of a slot is
//! its status: bit 0 marks it occupied and bit 1 grants admin privilege
//! (`0x00` empty, `0x01` user, `0x03` admin). Bytes 1..9 hold the address in
//! bus scan order. A slot whose bit 0 is clear is reusable regardless of its
//! other bytes.
//!
//! # Examples
//!
//! ```
//! use doorkey_core::TokenAddress;
//! use doorkey_storage::{CredentialRepository, CredentialStore, MemoryBackend};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = CredentialStore::open(MemoryBackend::default())?;
//! let admin: TokenAddress = "021cb801000000a2".parse()?;
//!
//! store.add(&admin)?;
//! store.set_admin(&admin)?;
//!
//! assert!(store.is_admin(&admin)?);
//! assert_eq!(store.capacity(), 113);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod backend;
pub mod error;
pub mod models;
pub mod repositories;

pub use backend::{FileBackend, MemoryBackend, NvBackend, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use models::{AddOutcome, CredentialRecord, SlotStatus};
pub use repositories::{CredentialRepository, CredentialStore};
