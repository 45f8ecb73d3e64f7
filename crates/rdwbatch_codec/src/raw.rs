//! Pass-through codec.

use crate::error::{CodecError, CodecResult};
use crate::RecordCodec;

/// A codec whose values are the record bytes themselves.
///
/// Used by tools that move or inspect records without interpreting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCodec {
    record_length: usize,
}

impl RawCodec {
    /// Creates a pass-through codec for records of `record_length` bytes.
    #[must_use]
    pub const fn new(record_length: usize) -> Self {
        Self { record_length }
    }
}

impl RecordCodec for RawCodec {
    type Value = Vec<u8>;

    fn record_length(&self) -> usize {
        self.record_length
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Vec<u8>> {
        CodecError::check_length(self.record_length, bytes.len())?;
        Ok(bytes.to_vec())
    }

    fn encode(&self, value: &Vec<u8>) -> CodecResult<Vec<u8>> {
        CodecError::check_length(self.record_length, value.len())?;
        Ok(value.clone())
    }
}
