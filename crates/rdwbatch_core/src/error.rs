//! Error types for rdwbatch core.

use crate::skip::StepStatus;
use rdwbatch_codec::CodecError;
use rdwbatch_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by record streams, position tracking, and configuration.
///
/// Clean end-of-stream is not an error: readers return `Ok(None)`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Record codec error while encoding a value.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A complete frame was read but its payload could not be decoded.
    ///
    /// Carries the raw record so a caller can turn it into a skip.
    #[error("record {index} could not be decoded: {source}")]
    Decode {
        /// 0-based index of the record.
        index: u64,
        /// Raw payload bytes of the record.
        bytes: Vec<u8>,
        /// Underlying codec error.
        #[source]
        source: CodecError,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A frame header is present but the frame is truncated or malformed.
    #[error("framing error at offset {offset} (record {record}): {message}")]
    Framing {
        /// Byte offset of the frame header.
        offset: u64,
        /// 0-based index of the record the frame should hold.
        record: u64,
        /// Description of the problem.
        message: String,
    },

    /// A restore or truncate targeted a record past the end of the stream.
    #[error("position out of range: record {requested} requested, {available} available")]
    PositionOutOfRange {
        /// Requested record index.
        requested: u64,
        /// Number of records actually present.
        available: u64,
    },

    /// The backend cannot move to the requested position.
    #[error("seek not supported: {message}")]
    SeekUnsupported {
        /// Description of the attempted move.
        message: String,
    },

    /// A position token could not be used by this stream.
    #[error("invalid position: {message}")]
    InvalidPosition {
        /// Description of the problem.
        message: String,
    },

    /// A required option is missing or an option value is invalid.
    #[error("configuration error in {option}: {message}")]
    Configuration {
        /// Name of the offending option.
        option: String,
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in the current stream state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates a framing error.
    pub fn framing(offset: u64, record: u64, message: impl Into<String>) -> Self {
        Self::Framing {
            offset,
            record,
            message: message.into(),
        }
    }

    /// Creates a seek-unsupported error.
    pub fn seek_unsupported(message: impl Into<String>) -> Self {
        Self::SeekUnsupported {
            message: message.into(),
        }
    }

    /// Creates an invalid position error.
    pub fn invalid_position(message: impl Into<String>) -> Self {
        Self::InvalidPosition {
            message: message.into(),
        }
    }

    /// Creates a configuration error for `option`.
    pub fn configuration(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for corrupt or truncated frames.
    #[must_use]
    pub fn is_framing(&self) -> bool {
        matches!(self, Self::Framing { .. })
    }

    /// Returns true for configuration errors.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Terminal status of a step that ends with this error.
    #[must_use]
    pub fn status(&self) -> StepStatus {
        if self.is_configuration() {
            StepStatus::Failed
        } else {
            StepStatus::Restartable
        }
    }
}
