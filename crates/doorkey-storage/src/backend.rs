//! Non-volatile backends for the credential store.
//!
//! A backend is a fixed-length, byte-addressed image. Writes are
//! write-through: when [`NvBackend::write`] returns, the bytes are on the
//! medium. The store relies on this to order its writes safely under power
//! loss, so backends must never buffer or reorder writes.

use crate::error::{StorageError, StorageResult};
use doorkey_core::constants::DEFAULT_STORE_SIZE;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Byte-addressed persistent medium.
pub trait NvBackend {
    /// Total size of the image in bytes.
    fn size(&self) -> usize;

    /// Fill `buf` with the bytes starting at `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> StorageResult<()>;

    /// Persist `data` at `offset` before returning.
    fn write(&mut self, offset: usize, data: &[u8]) -> StorageResult<()>;
}

fn check_bounds(offset: usize, len: usize, size: usize) -> StorageResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(StorageError::OutOfBounds { offset, len, size }),
    }
}

/// Volatile image kept in memory.
///
/// Used by tests and by `--in-memory` runs of the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryBackend {
    image: Vec<u8>,
}

impl MemoryBackend {
    /// Create a zero-filled image of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            image: vec![0; size],
        }
    }

    /// Wrap an existing image.
    pub fn from_image(image: Vec<u8>) -> Self {
        Self { image }
    }

    /// Raw contents of the image.
    pub fn image(&self) -> &[u8] {
        &self.image
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_SIZE)
    }
}

impl NvBackend for MemoryBackend {
    fn size(&self) -> usize {
        self.image.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> StorageResult<()> {
        check_bounds(offset, buf.len(), self.image.len())?;
        buf.copy_from_slice(&self.image[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> StorageResult<()> {
        check_bounds(offset, data.len(), self.image.len())?;
        self.image[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

/// Configuration for a file-backed store image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the image file
    pub path: PathBuf,

    /// Image size in bytes; the slot count is `size / 9`
    pub size: usize,

    /// Whether to create a zero-filled image if the file doesn't exist
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("doorkey.img"),
            size: DEFAULT_STORE_SIZE,
            create_if_missing: true,
        }
    }
}

impl StoreConfig {
    /// Create a new store configuration with the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set the image size in bytes
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Set whether to create the image if it doesn't exist
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

/// Image stored in a regular file.
///
/// Every write is followed by `sync_data`. Reads are served from a mirror
/// that is loaded at open and updated only after the file write succeeded.
#[derive(Debug)]
pub struct FileBackend {
    file: File,
    path: PathBuf,
    mirror: Vec<u8>,
}

impl FileBackend {
    /// Open the image described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file is missing and `create_if_missing` is false
    /// - An existing file does not have exactly `config.size` bytes
    /// - The file cannot be opened, read or created
    pub fn open(config: &StoreConfig) -> StorageResult<Self> {
        let path = config.path.as_path();

        if !path.exists() {
            if !config.create_if_missing {
                return Err(StorageError::Configuration(format!(
                    "Store image {} does not exist",
                    path.display()
                )));
            }
            Self::create_image(path, config.size)?;
        }

        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let actual = file.metadata()?.len();
        if actual != config.size as u64 {
            return Err(StorageError::Configuration(format!(
                "Store image {} is {} bytes, expected {}",
                path.display(),
                actual,
                config.size
            )));
        }

        let mut mirror = Vec::with_capacity(config.size);
        file.read_to_end(&mut mirror)?;
        debug!(path = %path.display(), size = mirror.len(), "Store image loaded");

        Ok(Self {
            file,
            path: path.to_path_buf(),
            mirror,
        })
    }

    fn create_image(path: &Path, size: usize) -> StorageResult<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Configuration(format!("Failed to create store directory: {}", e))
            })?;
        }

        let file = File::create(path)?;
        file.set_len(size as u64)?;
        file.sync_all()?;
        info!(path = %path.display(), size, "Created empty store image");
        Ok(())
    }

    /// Path of the image file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NvBackend for FileBackend {
    fn size(&self) -> usize {
        self.mirror.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> StorageResult<()> {
        check_bounds(offset, buf.len(), self.mirror.len())?;
        buf.copy_from_slice(&self.mirror[offset..offset + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> StorageResult<()> {
        check_bounds(offset, data.len(), self.mirror.len())?;
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.write_all(data)?;
        self.file.sync_data()?;
        self.mirror[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_memory_backend_starts_zeroed() {
        let backend = MemoryBackend::new(18);
        assert_eq!(backend.size(), 18);
        assert!(backend.image().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_memory_backend_write_then_read() {
        let mut backend = MemoryBackend::new(16);
        backend.write(4, &[1, 2, 3]).unwrap();

        let mut buf = [0u8; 5];
        backend.read(3, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 0]);
    }

    #[rstest]
    #[case(16, 1)]
    #[case(15, 2)]
    #[case(usize::MAX, 1)]
    fn test_memory_backend_rejects_out_of_bounds(#[case] offset: usize, #[case] len: usize) {
        let mut backend = MemoryBackend::new(16);
        let data = vec![0xAA; len];
        let result = backend.write(offset, &data);
        assert!(matches!(result, Err(StorageError::OutOfBounds { .. })));
        assert!(backend.image().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_store_config_builder() {
        let config = StoreConfig::new("/tmp/keys.img")
            .size(2048)
            .create_if_missing(false);

        assert_eq!(config.path, PathBuf::from("/tmp/keys.img"));
        assert_eq!(config.size, 2048);
        assert!(!config.create_if_missing);
    }

    #[test]
    fn test_file_backend_creates_zeroed_image() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("nested/keys.img")).size(27);

        let backend = FileBackend::open(&config).unwrap();
        assert_eq!(backend.size(), 27);

        let on_disk = std::fs::read(&config.path).unwrap();
        assert_eq!(on_disk, vec![0u8; 27]);
    }

    #[test]
    fn test_file_backend_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("keys.img")).size(18);

        let mut backend = FileBackend::open(&config).unwrap();
        backend.write(9, &[0x01, 0xAA]).unwrap();

        let on_disk = std::fs::read(&config.path).unwrap();
        assert_eq!(&on_disk[9..11], &[0x01, 0xAA]);

        drop(backend);
        let reopened = FileBackend::open(&config).unwrap();
        let mut buf = [0u8; 2];
        reopened.read(9, &mut buf).unwrap();
        assert_eq!(buf, [0x01, 0xAA]);
    }

    #[test]
    fn test_file_backend_missing_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("absent.img")).create_if_missing(false);

        let result = FileBackend::open(&config);
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }

    #[test]
    fn test_file_backend_rejects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.img");
        std::fs::write(&path, [0u8; 10]).unwrap();

        let result = FileBackend::open(&StoreConfig::new(&path).size(18));
        assert!(matches!(result, Err(StorageError::Configuration(_))));
    }
}
