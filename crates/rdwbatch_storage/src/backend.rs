//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level byte store underneath a record stream.
///
/// Storage backends are **opaque byte stores**. They provide simple operations
/// for reading, appending, and truncating data. The record stream owns all
/// framing - backends do not understand record descriptor words or record
/// lengths.
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `read_available` only returns fewer bytes than asked at end of storage
/// - `flush` pushes all appended data to the OS
/// - Backends must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent, seekable storage
/// - [`super::ForwardOnlyBackend`] - For pipes and other non-seekable handles
pub trait StorageBackend: Send + Sync {
    /// Reads exactly `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The offset is beyond the current size
    /// - The read would extend beyond the current size
    /// - The backend cannot read at `offset`
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Reads up to `max_len` bytes starting at `offset`.
    ///
    /// Returns fewer than `max_len` bytes only when the end of storage is
    /// reached, and an empty buffer when `offset` is at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if `offset` is beyond the end of storage or the
    /// backend cannot read at `offset`.
    fn read_available(&self, offset: u64, max_len: usize) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let remaining = size.saturating_sub(offset);
        let len = usize::try_from(remaining).map_or(max_len, |r| r.min(max_len));
        self.read_at(offset, len)
    }

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Flushes all pending writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// This is the offset where the next `append` will write.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// This is a stronger guarantee than `flush` - it ensures that
    /// file metadata (size, timestamps) is also durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Truncates the storage to the given size.
    ///
    /// This removes all data after the specified offset. Record writers use
    /// it on restart to discard output written after the last checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The truncation fails
    /// - `new_size` is greater than current size
    /// - The backend is append-only
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Returns whether the backend supports reads at arbitrary offsets
    /// and truncation.
    fn is_seekable(&self) -> bool {
        true
    }
}
