use crate::backend::NvBackend;
use crate::error::{StorageError, StorageResult};
use crate::models::{AddOutcome, CredentialRecord, SlotStatus};
use doorkey_core::constants::{ADDRESS_LEN, SLOT_SIZE, STATUS_EMPTY};
use doorkey_core::{KeyHash, TokenAddress, key_hash};
use tracing::{debug, info};

/// Repository trait for credential operations
///
/// This trait is the seam between policy (the authentication state machine
/// and the revocation client) and the persistent table. Every mutating
/// method has persisted its writes when it returns.
pub trait CredentialRepository {
    /// Slot index of the address, scanning occupied slots in ascending order
    fn find(&self, address: &TokenAddress) -> StorageResult<Option<usize>>;

    /// Whether the address is enrolled with admin privilege
    fn is_admin(&self, address: &TokenAddress) -> StorageResult<bool>;

    /// Enroll the address, or clear its admin bit if already enrolled
    fn add(&mut self, address: &TokenAddress) -> StorageResult<AddOutcome>;

    /// Remove the address, zeroing its slot; returns the freed slot
    fn delete(&mut self, address: &TokenAddress) -> StorageResult<usize>;

    /// Grant admin privilege to an enrolled address
    fn set_admin(&mut self, address: &TokenAddress) -> StorageResult<()>;

    /// Revoke admin privilege from an enrolled address
    fn clear_admin(&mut self, address: &TokenAddress) -> StorageResult<()>;

    /// First enrolled address whose `SHA-256(secret || address)` equals `candidate`
    fn match_by_hash(
        &self,
        candidate: &KeyHash,
        secret: &[u8],
    ) -> StorageResult<Option<TokenAddress>>;

    /// Set every slot to empty
    fn erase_all(&mut self) -> StorageResult<()>;

    /// Whether the address is enrolled
    fn check(&self, address: &TokenAddress) -> StorageResult<bool> {
        Ok(self.find(address)?.is_some())
    }
}

/// Fixed-capacity credential table on a non-volatile backend
///
/// The image is a contiguous array of 9-byte slots (status byte followed by
/// the 8 address bytes) with no header. Trailing bytes that do not fill a
/// whole slot are never touched.
///
/// # Write ordering
///
/// A slot must never be observable as occupied while its address bytes are
/// undefined, even if power fails between two writes:
/// - `add` writes the address bytes first and the status byte last
/// - `delete` clears the status byte first and zeroes the address after
/// - privilege changes rewrite the status byte alone
#[derive(Debug)]
pub struct CredentialStore<B> {
    backend: B,
    capacity: usize,
}

impl<B: NvBackend> CredentialStore<B> {
    /// Open a store over `backend`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Configuration` if the backend cannot hold a
    /// single slot.
    pub fn open(backend: B) -> StorageResult<Self> {
        let capacity = backend.size() / SLOT_SIZE;
        if capacity == 0 {
            return Err(StorageError::Configuration(format!(
                "Backend of {} bytes cannot hold a {SLOT_SIZE}-byte slot",
                backend.size()
            )));
        }
        debug!(capacity, "Credential store opened");
        Ok(Self { backend, capacity })
    }

    /// Number of slots in the table
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Consume the store and return its backend
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// All occupied slots in ascending slot order
    pub fn records(&self) -> StorageResult<Vec<CredentialRecord>> {
        let mut records = Vec::new();
        for slot in 0..self.capacity {
            let (status, address) = self.read_slot(slot)?;
            if status.is_occupied() {
                records.push(CredentialRecord {
                    slot,
                    status,
                    address,
                });
            }
        }
        Ok(records)
    }

    /// Number of occupied slots
    pub fn len(&self) -> StorageResult<usize> {
        let mut count = 0;
        for slot in 0..self.capacity {
            if self.read_status(slot)?.is_occupied() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Whether no slot is occupied
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }

    fn offset(slot: usize) -> usize {
        slot * SLOT_SIZE
    }

    fn read_status(&self, slot: usize) -> StorageResult<SlotStatus> {
        let mut byte = [0u8; 1];
        self.backend.read(Self::offset(slot), &mut byte)?;
        Ok(SlotStatus::from_byte(byte[0]))
    }

    fn read_slot(&self, slot: usize) -> StorageResult<(SlotStatus, TokenAddress)> {
        let mut raw = [0u8; SLOT_SIZE];
        self.backend.read(Self::offset(slot), &mut raw)?;

        let mut address = [0u8; ADDRESS_LEN];
        address.copy_from_slice(&raw[1..]);
        Ok((SlotStatus::from_byte(raw[0]), TokenAddress::new(address)))
    }

    fn write_status(&mut self, slot: usize, status: SlotStatus) -> StorageResult<()> {
        self.backend
            .write(Self::offset(slot), &[status.to_byte()])
    }

    fn write_address(&mut self, slot: usize, address: &[u8; ADDRESS_LEN]) -> StorageResult<()> {
        self.backend.write(Self::offset(slot) + 1, address)
    }

    fn find_slot(&self, address: &TokenAddress) -> StorageResult<Option<(usize, SlotStatus)>> {
        for slot in 0..self.capacity {
            let (status, stored) = self.read_slot(slot)?;
            if status.is_occupied() && stored == *address {
                return Ok(Some((slot, status)));
            }
        }
        Ok(None)
    }

    fn require_slot(&self, address: &TokenAddress) -> StorageResult<(usize, SlotStatus)> {
        self.find_slot(address)?
            .ok_or(StorageError::NotFound { address: *address })
    }
}

impl<B: NvBackend> CredentialRepository for CredentialStore<B> {
    fn find(&self, address: &TokenAddress) -> StorageResult<Option<usize>> {
        Ok(self.find_slot(address)?.map(|(slot, _)| slot))
    }

    fn is_admin(&self, address: &TokenAddress) -> StorageResult<bool> {
        Ok(self
            .find_slot(address)?
            .is_some_and(|(_, status)| status.is_admin()))
    }

    fn add(&mut self, address: &TokenAddress) -> StorageResult<AddOutcome> {
        if let Some((slot, status)) = self.find_slot(address)? {
            let demoted = status.is_admin();
            if demoted {
                self.write_status(slot, SlotStatus::InUse)?;
                info!(slot, %address, "Existing admin credential re-added, admin bit cleared");
            } else {
                debug!(slot, %address, "Credential already enrolled");
            }
            return Ok(AddOutcome::AlreadyExists { slot, demoted });
        }

        for slot in 0..self.capacity {
            if self.read_status(slot)?.is_occupied() {
                continue;
            }
            self.write_address(slot, address.as_bytes())?;
            self.write_status(slot, SlotStatus::InUse)?;
            debug!(slot, %address, "Credential added");
            return Ok(AddOutcome::Added { slot });
        }

        Err(StorageError::StoreFull {
            capacity: self.capacity,
        })
    }

    fn delete(&mut self, address: &TokenAddress) -> StorageResult<usize> {
        let (slot, _) = self.require_slot(address)?;

        self.write_status(slot, SlotStatus::Empty)?;
        self.write_address(slot, &[0u8; ADDRESS_LEN])?;
        debug!(slot, %address, "Credential deleted");
        Ok(slot)
    }

    fn set_admin(&mut self, address: &TokenAddress) -> StorageResult<()> {
        let (slot, _) = self.require_slot(address)?;
        self.write_status(slot, SlotStatus::Admin)?;
        debug!(slot, %address, "Admin bit set");
        Ok(())
    }

    fn clear_admin(&mut self, address: &TokenAddress) -> StorageResult<()> {
        let (slot, _) = self.require_slot(address)?;
        self.write_status(slot, SlotStatus::InUse)?;
        debug!(slot, %address, "Admin bit cleared");
        Ok(())
    }

    fn match_by_hash(
        &self,
        candidate: &KeyHash,
        secret: &[u8],
    ) -> StorageResult<Option<TokenAddress>> {
        for slot in 0..self.capacity {
            let (status, address) = self.read_slot(slot)?;
            if status.is_occupied() && key_hash(secret, &address) == *candidate {
                debug!(slot, "Revocation hash matched");
                return Ok(Some(address));
            }
        }
        Ok(None)
    }

    fn erase_all(&mut self) -> StorageResult<()> {
        for slot in 0..self.capacity {
            self.backend
                .write(Self::offset(slot), &[STATUS_EMPTY])?;
        }
        let size = self.backend.size();
        self.backend.write(0, &vec![0u8; size])?;
        info!(capacity = self.capacity, "Credential store erased");
        Ok(())
    }
}
