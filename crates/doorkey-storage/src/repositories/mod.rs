pub mod credential;

pub use credential::{CredentialRepository, CredentialStore};
