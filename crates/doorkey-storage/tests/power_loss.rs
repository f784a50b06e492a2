//! Power-loss ordering tests for the credential store
//!
//! A journaling backend records every byte the store writes. Each test then
//! replays every prefix of that journal onto the image as it was before the
//! operation, simulating a power cut after each byte, and checks that no
//! occupied slot ever holds a torn address.

use doorkey_core::TokenAddress;
use doorkey_core::constants::SLOT_SIZE;
use doorkey_storage::{
    CredentialRepository, CredentialStore, MemoryBackend, NvBackend, StorageResult,
};

/// Memory backend that journals writes one byte at a time.
#[derive(Debug, Clone)]
struct JournalingBackend {
    inner: MemoryBackend,
    journal: Vec<(usize, u8)>,
}

impl JournalingBackend {
    fn new(image: Vec<u8>) -> Self {
        Self {
            inner: MemoryBackend::from_image(image),
            journal: Vec::new(),
        }
    }
}

impl NvBackend for JournalingBackend {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> StorageResult<()> {
        self.inner.read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> StorageResult<()> {
        self.inner.write(offset, data)?;
        self.journal
            .extend(data.iter().enumerate().map(|(i, &b)| (offset + i, b)));
        Ok(())
    }
}

fn addr(n: u8) -> TokenAddress {
    TokenAddress::with_checksum([0x01, n, n, n, n, n, n])
}

/// Replay every prefix of `journal` onto `before` and return the images.
fn crash_images(before: &[u8], journal: &[(usize, u8)]) -> Vec<Vec<u8>> {
    let mut images = Vec::with_capacity(journal.len() + 1);
    let mut image = before.to_vec();
    images.push(image.clone());
    for &(offset, byte) in journal {
        image[offset] = byte;
        images.push(image.clone());
    }
    images
}

/// Every occupied slot holds one of the `allowed` addresses in full.
fn assert_no_torn_slots(image: &[u8], allowed: &[TokenAddress]) {
    let store = CredentialStore::open(MemoryBackend::from_image(image.to_vec())).unwrap();
    for record in store.records().unwrap() {
        assert!(
            allowed.contains(&record.address),
            "slot {} occupied with torn address {}",
            record.slot,
            record.address
        );
    }
}

fn prepared(addresses: &[TokenAddress], slots: usize) -> Vec<u8> {
    let mut store = CredentialStore::open(MemoryBackend::new(slots * SLOT_SIZE)).unwrap();
    for address in addresses {
        store.add(address).unwrap();
    }
    store.into_backend().image().to_vec()
}

#[test]
fn test_add_never_exposes_partial_address() {
    let before = prepared(&[addr(1)], 3);
    let mut store = CredentialStore::open(JournalingBackend::new(before.clone())).unwrap();

    store.add(&addr(2)).unwrap();
    let journal = store.into_backend().journal;

    // status byte comes last
    assert_eq!(journal.last(), Some(&(SLOT_SIZE, 0x01)));
    for image in crash_images(&before, &journal) {
        assert_no_torn_slots(&image, &[addr(1), addr(2)]);
    }
}

#[test]
fn test_add_over_dirty_free_slot() {
    // Free slot left with stale address bytes by an interrupted delete
    let mut before = prepared(&[addr(1), addr(3)], 2);
    before[0] = 0x00;

    let mut store = CredentialStore::open(JournalingBackend::new(before.clone())).unwrap();
    store.add(&addr(2)).unwrap();
    let journal = store.into_backend().journal;

    for image in crash_images(&before, &journal) {
        assert_no_torn_slots(&image, &[addr(2), addr(3)]);
    }
}

#[test]
fn test_delete_clears_status_first() {
    let before = prepared(&[addr(1), addr(2)], 2);
    let mut store = CredentialStore::open(JournalingBackend::new(before.clone())).unwrap();

    store.delete(&addr(2)).unwrap();
    let journal = store.into_backend().journal;

    assert_eq!(journal.first(), Some(&(SLOT_SIZE, 0x00)));
    for image in crash_images(&before, &journal) {
        assert_no_torn_slots(&image, &[addr(1), addr(2)]);
    }
}

#[test]
fn test_privilege_change_touches_status_only() {
    let before = prepared(&[addr(1)], 2);
    let mut store = CredentialStore::open(JournalingBackend::new(before)).unwrap();

    store.set_admin(&addr(1)).unwrap();
    store.clear_admin(&addr(1)).unwrap();

    let journal = store.into_backend().journal;
    assert_eq!(journal, vec![(0, 0x03), (0, 0x01)]);
}

#[test]
fn test_erase_all_clears_every_status_before_addresses() {
    let before = prepared(&[addr(1), addr(2), addr(3)], 3);
    let mut store = CredentialStore::open(JournalingBackend::new(before.clone())).unwrap();

    store.erase_all().unwrap();
    let journal = store.into_backend().journal;

    let first_address_write = journal
        .iter()
        .position(|&(offset, _)| offset % SLOT_SIZE != 0)
        .unwrap();
    assert!(
        journal[..first_address_write]
            .iter()
            .filter(|&&(_, b)| b == 0)
            .count()
            >= 3
    );
    for image in crash_images(&before, &journal) {
        assert_no_torn_slots(&image, &[addr(1), addr(2), addr(3)]);
    }
}
