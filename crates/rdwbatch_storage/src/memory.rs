//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// A seekable byte store held in a `Vec<u8>`.
///
/// Used for tests, for corruption scenarios built from raw bytes, and for
/// scratch datasets that never outlive a step. Streams over it use
/// byte-offset positioning unless replay is configured.
///
/// # Example
///
/// ```rust
/// use rdwbatch_storage::{InMemoryBackend, StorageBackend};
///
/// // One 4-byte record framed by its descriptor word, then a torn header.
/// let backend = InMemoryBackend::with_data(vec![0, 6, b'a', b'b', b'c', b'd', 0]);
/// assert_eq!(backend.read_at(0, 2).unwrap(), [0, 6]);
/// assert_eq!(backend.read_available(6, 2).unwrap(), [0]);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    bytes: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with `bytes`, e.g. a dataset with a damaged tail.
    #[must_use]
    pub fn with_data(bytes: Vec<u8>) -> Self {
        Self {
            bytes: RwLock::new(bytes),
        }
    }

    /// Copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.bytes.read().clone()
    }

    /// Drops every stored byte.
    pub fn clear(&mut self) {
        self.bytes.get_mut().clear();
    }

    fn range(len_stored: usize, offset: u64, len: usize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(offset).ok()?;
        let end = start.checked_add(len)?;
        (end <= len_stored).then_some(start..end)
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let bytes = self.bytes.read();
        Self::range(bytes.len(), offset, len)
            .map(|range| bytes[range].to_vec())
            .ok_or(StorageError::ReadPastEnd {
                offset,
                len,
                size: bytes.len() as u64,
            })
    }

    fn read_available(&self, offset: u64, max_len: usize) -> StorageResult<Vec<u8>> {
        let bytes = self.bytes.read();
        let size = bytes.len() as u64;
        if offset > size {
            return Err(StorageError::ReadPastEnd {
                offset,
                len: max_len,
                size,
            });
        }
        let tail = &bytes[offset as usize..];
        Ok(tail[..tail.len().min(max_len)].to_vec())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let bytes = self.bytes.get_mut();
        let offset = bytes.len() as u64;
        bytes.extend_from_slice(data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.bytes.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let bytes = self.bytes.get_mut();
        let size = bytes.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size,
            });
        }
        bytes.truncate(new_size as usize);
        Ok(())
    }
}
