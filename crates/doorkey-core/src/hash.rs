//! Secret-keyed token hashing.
//!
//! The server never sees raw token addresses. Both the revocation protocol
//! and the access log identify a credential by
//! `SHA-256(secret || address)`, where the secret is shared between the
//! terminal and the server. Digests travel as raw bytes in revocation
//! responses and as lowercase hex in logging requests.

use crate::{Result, TokenAddress, constants::HASH_LEN, error::Error};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

/// SHA-256 digest identifying a credential without revealing its address.
#[derive(Debug, Clone, Copy, Eq)]
pub struct KeyHash([u8; HASH_LEN]);

impl KeyHash {
    #[must_use]
    pub const fn new(bytes: [u8; HASH_LEN]) -> Self {
        KeyHash(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex form used in logging requests.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Compute `SHA-256(secret || address)`.
///
/// # Examples
///
/// ```
/// use doorkey_core::{TokenAddress, key_hash};
///
/// let address: TokenAddress = "021cb801000000a2".parse().unwrap();
/// let hash = key_hash(b"some very long sentence", &address);
/// assert_eq!(hash.to_hex().len(), 64);
/// ```
#[must_use]
pub fn key_hash(secret: &[u8], address: &TokenAddress) -> KeyHash {
    let mut hasher = Sha256::new();
    hasher.update(secret);
    hasher.update(address.as_bytes());
    KeyHash(hasher.finalize().into())
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for KeyHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; HASH_LEN];
        hex::decode_to_slice(s.trim(), &mut bytes)
            .map_err(|e| Error::InvalidHash(format!("expected {HASH_LEN} hex bytes: {e}")))?;
        Ok(KeyHash(bytes))
    }
}

/// Constant-time comparison, so a probing server cannot learn digest
/// prefixes from response timing.
impl PartialEq for KeyHash {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}
