//! Data models stored in the credential table

pub mod credential;

pub use credential::{AddOutcome, CredentialRecord, SlotStatus};
