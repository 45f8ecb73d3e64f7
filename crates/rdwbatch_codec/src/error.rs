//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while converting records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A buffer did not have the codec's fixed record length.
    #[error("record length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// The codec's record length.
        expected: usize,
        /// Length of the buffer that was supplied or produced.
        actual: usize,
    },

    /// Failed to encode a value.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a record.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// A field extends past the end of the record.
    #[error("field at offset {offset} with width {width} exceeds record length {record_length}")]
    FieldOutOfBounds {
        /// Start offset of the field.
        offset: usize,
        /// Width of the field in bytes.
        width: usize,
        /// The record length.
        record_length: usize,
    },

    /// A value does not fit in its fixed-width field.
    #[error("value of {actual} bytes does not fit in field of width {width}")]
    ValueTooWide {
        /// Width of the field in bytes.
        width: usize,
        /// Encoded size of the value.
        actual: usize,
    },

    /// A text field does not hold valid UTF-8.
    #[error("invalid text in field at offset {offset}")]
    InvalidText {
        /// Start offset of the field.
        offset: usize,
    },

    /// A packed-decimal field holds an invalid digit or sign nibble.
    #[error("invalid packed decimal at offset {offset}: {message}")]
    InvalidPackedDecimal {
        /// Start offset of the field.
        offset: usize,
        /// Description of the problem.
        message: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Returns an error unless `actual` equals `expected`.
    pub fn check_length(expected: usize, actual: usize) -> CodecResult<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::LengthMismatch { expected, actual })
        }
    }
}
