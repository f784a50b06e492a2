use doorkey_core::TokenAddress;
use doorkey_core::constants::{STATUS_ADMIN_BIT, STATUS_EMPTY, STATUS_IN_USE_BIT};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Occupancy and privilege of a credential slot.
///
/// Stored as a bit field in the first byte of every slot: bit 0 marks the
/// slot as in use, bit 1 grants administrator privilege. Admin implies in
/// use, so a status byte with bit 0 clear decodes as [`SlotStatus::Empty`]
/// whatever its other bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Empty,
    InUse,
    Admin,
}

impl SlotStatus {
    /// Decode a status byte read from the medium.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        if byte & STATUS_IN_USE_BIT == 0 {
            SlotStatus::Empty
        } else if byte & STATUS_ADMIN_BIT != 0 {
            SlotStatus::Admin
        } else {
            SlotStatus::InUse
        }
    }

    /// Encode for the medium.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            SlotStatus::Empty => STATUS_EMPTY,
            SlotStatus::InUse => STATUS_IN_USE_BIT,
            SlotStatus::Admin => STATUS_IN_USE_BIT | STATUS_ADMIN_BIT,
        }
    }

    /// Returns `true` for in-use and admin slots.
    #[inline]
    #[must_use]
    pub fn is_occupied(self) -> bool {
        !matches!(self, SlotStatus::Empty)
    }

    #[inline]
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, SlotStatus::Admin)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SlotStatus::Empty => write!(f, "empty"),
            SlotStatus::InUse => write!(f, "in-use"),
            SlotStatus::Admin => write!(f, "admin"),
        }
    }
}

/// An occupied slot as seen by `dump` and the tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Slot index in the table
    pub slot: usize,

    /// Slot status (never `Empty` for returned records)
    pub status: SlotStatus,

    /// Token address held by the slot
    pub address: TokenAddress,
}

/// Result of [`add`](crate::CredentialRepository::add).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The address took a previously empty slot
    Added { slot: usize },

    /// The address was already enrolled; `demoted` is true when it held
    /// admin privilege, which adding again revokes
    AlreadyExists { slot: usize, demoted: bool },
}

impl AddOutcome {
    #[must_use]
    pub fn slot(&self) -> usize {
        match self {
            AddOutcome::Added { slot } | AddOutcome::AlreadyExists { slot, .. } => *slot,
        }
    }
}
