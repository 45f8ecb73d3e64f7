//! Crash and corruption simulation for record datasets.
//!
//! ## Test Strategy
//!
//! 1. **Torn tail** - the writer died part way through a frame
//! 2. **Stray bytes** - something other than a frame was appended
//! 3. **Bad length** - a header was overwritten with the wrong length
//! 4. **Crash mid-step** - a backend that stops working after N appends,
//!    leaving a partial frame behind
//!
//! ## Usage
//!
//! ```rust
//! use rdwbatch_testkit::prelude::*;
//!
//! let dataset = TestDataset::new();
//! dataset.write_records(&abc_records());
//! Corruption::TruncateTail(10).apply_to_file(dataset.path(), TEST_RECORD_LENGTH + 2);
//! ```

use rdwbatch_storage::{StorageBackend, StorageError, StorageResult};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A way to damage a dataset's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// Drop the last `n` bytes.
    TruncateTail(usize),
    /// Append bytes that do not form a frame.
    StrayBytes(Vec<u8>),
    /// Overwrite the length field of record `record`.
    BadLength {
        /// Zero-based record whose header is damaged.
        record: u64,
        /// Length written into the header.
        length: u16,
    },
}

impl Corruption {
    /// Applies the corruption to `data`, a dataset of `frame_size` frames.
    ///
    /// # Panics
    ///
    /// Panics if `BadLength` names a record past the end of `data`.
    pub fn apply(&self, data: &mut Vec<u8>, frame_size: usize) {
        match self {
            Self::TruncateTail(n) => {
                let keep = data.len().saturating_sub(*n);
                data.truncate(keep);
            }
            Self::StrayBytes(bytes) => data.extend_from_slice(bytes),
            Self::BadLength { record, length } => {
                let offset = *record as usize * frame_size;
                assert!(offset + 2 <= data.len(), "record {record} is past the end");
                data[offset..offset + 2].copy_from_slice(&length.to_be_bytes());
            }
        }
    }

    /// Applies the corruption to the file at `path`.
    pub fn apply_to_file(&self, path: &Path, frame_size: usize) {
        let mut data = std::fs::read(path).expect("Failed to read dataset");
        self.apply(&mut data, frame_size);
        std::fs::write(path, data).expect("Failed to write dataset");
    }

    /// Number of leading records a reader still sees intact, given a
    /// dataset of `records` frames of `frame_size` bytes.
    pub fn intact_records(&self, records: u64, frame_size: usize) -> u64 {
        match self {
            Self::TruncateTail(n) => {
                let size = (records as usize * frame_size).saturating_sub(*n);
                (size / frame_size) as u64
            }
            Self::StrayBytes(_) => records,
            Self::BadLength { record, .. } => (*record).min(records),
        }
    }
}

/// A backend that crashes after a number of successful appends.
///
/// The crashing append writes half of its data and fails. From then on
/// every mutating operation fails, so a writer cannot roll the partial
/// frame back. Reads keep working.
pub struct CrashingBackend<B> {
    inner: B,
    appends_left: usize,
    crashed: Arc<AtomicBool>,
}

impl<B: StorageBackend> CrashingBackend<B> {
    /// Wraps `inner`, crashing on append number `appends + 1`.
    pub fn new(inner: B, appends: usize) -> Self {
        Self {
            inner,
            appends_left: appends,
            crashed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A flag that turns true once the backend has crashed.
    pub fn crash_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.crashed)
    }

    /// Unwraps the inner backend.
    pub fn into_inner(self) -> B {
        self.inner
    }

    fn crash_error() -> StorageError {
        StorageError::Io(std::io::Error::other("simulated crash"))
    }

    fn check_alive(&self) -> StorageResult<()> {
        if self.crashed.load(Ordering::SeqCst) {
            return Err(Self::crash_error());
        }
        Ok(())
    }
}

impl<B: StorageBackend> StorageBackend for CrashingBackend<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.check_alive()?;
        if self.appends_left == 0 {
            self.inner.append(&data[..data.len() / 2])?;
            self.inner.flush()?;
            self.crashed.store(true, Ordering::SeqCst);
            return Err(Self::crash_error());
        }
        self.appends_left -= 1;
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.check_alive()?;
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.check_alive()?;
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.check_alive()?;
        self.inner.truncate(new_size)
    }

    fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{frames, memory_dataset, abc_records, TEST_RECORD_LENGTH};
    use rdwbatch_storage::InMemoryBackend;

    const FRAME: usize = TEST_RECORD_LENGTH + 2;

    #[test]
    fn truncate_tail_cuts_into_last_frame() {
        let mut data = memory_dataset(&abc_records()).data();
        let corruption = Corruption::TruncateTail(10);
        corruption.apply(&mut data, FRAME);
        assert_eq!(data.len(), 3 * FRAME - 10);
        assert_eq!(corruption.intact_records(3, FRAME), 2);
    }

    #[test]
    fn bad_length_overwrites_header() {
        let mut data = frames(&[b"ab", b"cd"]);
        let corruption = Corruption::BadLength { record: 1, length: 9 };
        corruption.apply(&mut data, 4);
        assert_eq!(&data[4..6], &[0x00, 0x09]);
        assert_eq!(corruption.intact_records(2, 4), 1);
    }

    #[test]
    fn crashing_backend_leaves_partial_append() {
        let mut backend = CrashingBackend::new(InMemoryBackend::new(), 1);
        let flag = backend.crash_flag();

        backend.append(b"abcd").unwrap();
        assert!(backend.append(b"efgh").is_err());
        assert!(flag.load(Ordering::SeqCst));
        assert!(backend.truncate(4).is_err());
        assert_eq!(backend.into_inner().data(), b"abcdef".to_vec());
    }
}
