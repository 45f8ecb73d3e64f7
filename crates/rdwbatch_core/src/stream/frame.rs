//! RDW frame layout.
//!
//! ```text
//! +---------+---------+------------------------+
//! | len hi  | len lo  | payload (record_length)|
//! +---------+---------+------------------------+
//! ```
//!
//! `len` is big-endian and counts the whole frame, header included.

use crate::error::{CoreError, CoreResult};

/// Size of the record descriptor word.
pub const HEADER_SIZE: usize = 2;

/// Largest payload whose frame length still fits in the header.
pub const MAX_RECORD_LENGTH: usize = u16::MAX as usize - HEADER_SIZE;

/// Total frame size for a payload of `record_length` bytes.
#[must_use]
pub const fn frame_size(record_length: usize) -> usize {
    record_length + HEADER_SIZE
}

/// Encodes the header for a payload of `record_length` bytes.
///
/// # Errors
///
/// Returns an error if the frame would not fit in 16 bits.
pub fn encode_header(record_length: usize) -> CoreResult<[u8; HEADER_SIZE]> {
    let len = u16::try_from(frame_size(record_length)).map_err(|_| {
        CoreError::invalid_operation(format!(
            "record length {record_length} exceeds {MAX_RECORD_LENGTH}"
        ))
    })?;
    Ok(len.to_be_bytes())
}

/// Decodes the frame length carried by a header.
#[must_use]
pub fn decode_header(header: [u8; HEADER_SIZE]) -> usize {
    usize::from(u16::from_be_bytes(header))
}

/// Builds a complete frame around `payload`.
///
/// # Errors
///
/// Returns an error if the payload is too long for one frame.
pub fn encode_frame(payload: &[u8]) -> CoreResult<Vec<u8>> {
    let header = encode_header(payload.len())?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Checks a header read at `offset` for record `record`.
pub(crate) fn check_header(
    header: [u8; HEADER_SIZE],
    expected_frame: usize,
    offset: u64,
    record: u64,
) -> CoreResult<()> {
    let len = decode_header(header);
    if len != expected_frame {
        return Err(CoreError::framing(
            offset,
            record,
            format!("length field {len} does not match frame size {expected_frame}"),
        ));
    }
    Ok(())
}
