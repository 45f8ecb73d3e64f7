//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// Attempted to truncate to a size larger than the storage.
    #[error("cannot truncate to size {requested} which is greater than current size {size}")]
    TruncatePastEnd {
        /// The requested new size.
        requested: u64,
        /// The current storage size.
        size: u64,
    },

    /// The backend cannot perform the operation.
    ///
    /// Forward-only backends return this for backwards reads, reads away
    /// from the current cursor, and truncation.
    #[error("operation not supported by {backend} backend: {operation}")]
    Unsupported {
        /// Backend kind that rejected the operation.
        backend: &'static str,
        /// Description of the rejected operation.
        operation: String,
    },

    /// Another handle holds the exclusive lock on the file.
    #[error("storage locked: another process has exclusive access to {path}")]
    Locked {
        /// Path of the locked file.
        path: String,
    },

    /// The storage is closed.
    #[error("storage is closed")]
    Closed,
}

impl StorageError {
    /// Creates an unsupported-operation error.
    pub fn unsupported(backend: &'static str, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            backend,
            operation: operation.into(),
        }
    }
}
