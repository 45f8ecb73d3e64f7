//! Fixed-position field helpers for hand-written codecs.
//!
//! Binary integers are big-endian, text is left-justified and padded with
//! spaces, and packed decimals use the usual COMP-3 nibble layout (one digit
//! per nibble, sign in the last nibble: `C` positive, `D` negative).

use crate::error::{CodecError, CodecResult};
use bytes::{Buf, BufMut, BytesMut};

/// Largest number of digits a packed-decimal field may hold as an `i64`.
const MAX_PACKED_DIGITS: usize = 18;

const SIGN_POSITIVE: u8 = 0x0C;
const SIGN_NEGATIVE: u8 = 0x0D;

fn packed_width(digits: usize) -> usize {
    digits / 2 + 1
}

/// Builds a record buffer field by field.
///
/// ```
/// use rdwbatch_codec::{FieldReader, FieldWriter};
///
/// let mut writer = FieldWriter::new(12);
/// writer.put_i32(42).unwrap();
/// writer.put_text("abc", 8).unwrap();
/// let bytes = writer.finish();
///
/// let mut reader = FieldReader::new(&bytes);
/// assert_eq!(reader.get_i32().unwrap(), 42);
/// assert_eq!(reader.get_text(8).unwrap(), "abc");
/// ```
#[derive(Debug)]
pub struct FieldWriter {
    buf: BytesMut,
    record_length: usize,
}

impl FieldWriter {
    /// Creates a writer for a record of `record_length` bytes.
    #[must_use]
    pub fn new(record_length: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(record_length),
            record_length,
        }
    }

    /// Offset at which the next field will be written.
    #[must_use]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    fn reserve(&self, width: usize) -> CodecResult<()> {
        if self.buf.len() + width > self.record_length {
            return Err(CodecError::FieldOutOfBounds {
                offset: self.buf.len(),
                width,
                record_length: self.record_length,
            });
        }
        Ok(())
    }

    /// Writes one byte.
    pub fn put_u8(&mut self, value: u8) -> CodecResult<()> {
        self.reserve(1)?;
        self.buf.put_u8(value);
        Ok(())
    }

    /// Writes a big-endian `i16`.
    pub fn put_i16(&mut self, value: i16) -> CodecResult<()> {
        self.reserve(2)?;
        self.buf.put_i16(value);
        Ok(())
    }

    /// Writes a big-endian `i32`.
    pub fn put_i32(&mut self, value: i32) -> CodecResult<()> {
        self.reserve(4)?;
        self.buf.put_i32(value);
        Ok(())
    }

    /// Writes a big-endian `i64`.
    pub fn put_i64(&mut self, value: i64) -> CodecResult<()> {
        self.reserve(8)?;
        self.buf.put_i64(value);
        Ok(())
    }

    /// Writes a big-endian `u32`.
    pub fn put_u32(&mut self, value: u32) -> CodecResult<()> {
        self.reserve(4)?;
        self.buf.put_u32(value);
        Ok(())
    }

    /// Writes raw bytes into a field of `width`, zero-filling the rest.
    pub fn put_bytes(&mut self, value: &[u8], width: usize) -> CodecResult<()> {
        if value.len() > width {
            return Err(CodecError::ValueTooWide {
                width,
                actual: value.len(),
            });
        }
        self.reserve(width)?;
        self.buf.put_slice(value);
        self.buf.put_bytes(0, width - value.len());
        Ok(())
    }

    /// Writes left-justified text into a field of `width`, padded with spaces.
    pub fn put_text(&mut self, value: &str, width: usize) -> CodecResult<()> {
        let bytes = value.as_bytes();
        if bytes.len() > width {
            return Err(CodecError::ValueTooWide {
                width,
                actual: bytes.len(),
            });
        }
        self.reserve(width)?;
        self.buf.put_slice(bytes);
        self.buf.put_bytes(b' ', width - bytes.len());
        Ok(())
    }

    /// Writes a signed packed-decimal field holding up to `digits` digits.
    ///
    /// The field occupies `digits / 2 + 1` bytes.
    pub fn put_packed_decimal(&mut self, value: i64, digits: usize) -> CodecResult<()> {
        if digits == 0 || digits > MAX_PACKED_DIGITS {
            return Err(CodecError::encoding_failed(format!(
                "packed decimal must have 1 to {MAX_PACKED_DIGITS} digits, got {digits}"
            )));
        }

        let width = packed_width(digits);
        let magnitude = value.unsigned_abs().to_string();
        if magnitude.len() > digits {
            return Err(CodecError::ValueTooWide {
                width,
                actual: packed_width(magnitude.len()),
            });
        }
        self.reserve(width)?;

        let digit_nibbles = width * 2 - 1;
        let mut nibbles = Vec::with_capacity(width * 2);
        nibbles.resize(digit_nibbles - magnitude.len(), 0u8);
        nibbles.extend(magnitude.bytes().map(|d| d - b'0'));
        nibbles.push(if value < 0 { SIGN_NEGATIVE } else { SIGN_POSITIVE });

        for pair in nibbles.chunks_exact(2) {
            self.buf.put_u8((pair[0] << 4) | pair[1]);
        }
        Ok(())
    }

    /// Returns the record, zero-filling any bytes not yet written.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        let remaining = self.record_length - self.buf.len();
        self.buf.put_bytes(0, remaining);
        self.buf.to_vec()
    }
}

/// Reads fields from a record buffer in order.
#[derive(Debug)]
pub struct FieldReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    /// Creates a reader positioned at the start of `buf`.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    /// Offset of the next field.
    #[must_use]
    pub fn position(&self) -> usize {
        self.offset
    }

    fn field(&mut self, width: usize) -> CodecResult<&'a [u8]> {
        let end = self.offset + width;
        if end > self.buf.len() {
            return Err(CodecError::FieldOutOfBounds {
                offset: self.offset,
                width,
                record_length: self.buf.len(),
            });
        }
        let field = &self.buf[self.offset..end];
        self.offset = end;
        Ok(field)
    }

    /// Skips `width` bytes.
    pub fn skip(&mut self, width: usize) -> CodecResult<()> {
        self.field(width).map(|_| ())
    }

    /// Reads one byte.
    pub fn get_u8(&mut self) -> CodecResult<u8> {
        Ok(self.field(1)?.get_u8())
    }

    /// Reads a big-endian `i16`.
    pub fn get_i16(&mut self) -> CodecResult<i16> {
        Ok(self.field(2)?.get_i16())
    }

    /// Reads a big-endian `i32`.
    pub fn get_i32(&mut self) -> CodecResult<i32> {
        Ok(self.field(4)?.get_i32())
    }

    /// Reads a big-endian `i64`.
    pub fn get_i64(&mut self) -> CodecResult<i64> {
        Ok(self.field(8)?.get_i64())
    }

    /// Reads a big-endian `u32`.
    pub fn get_u32(&mut self) -> CodecResult<u32> {
        Ok(self.field(4)?.get_u32())
    }

    /// Reads a raw field of `width` bytes.
    pub fn get_bytes(&mut self, width: usize) -> CodecResult<&'a [u8]> {
        self.field(width)
    }

    /// Reads a text field of `width` bytes, dropping trailing spaces.
    pub fn get_text(&mut self, width: usize) -> CodecResult<String> {
        let offset = self.offset;
        let field = self.field(width)?;
        let text = std::str::from_utf8(field).map_err(|_| CodecError::InvalidText { offset })?;
        Ok(text.trim_end_matches(' ').to_string())
    }

    /// Reads a signed packed-decimal field of up to `digits` digits.
    pub fn get_packed_decimal(&mut self, digits: usize) -> CodecResult<i64> {
        let offset = self.offset;
        if digits == 0 || digits > MAX_PACKED_DIGITS {
            return Err(CodecError::InvalidPackedDecimal {
                offset,
                message: format!("unsupported digit count {digits}"),
            });
        }
        let field = self.field(packed_width(digits))?;
        let invalid = |message: String| CodecError::InvalidPackedDecimal { offset, message };

        let mut value: i64 = 0;
        let last = field.len() - 1;
        for (i, byte) in field.iter().enumerate() {
            let high = byte >> 4;
            let low = byte & 0x0F;
            let digits_here: &[u8] = if i == last { &[high] } else { &[high, low] };

            for &digit in digits_here {
                if digit > 9 {
                    return Err(invalid(format!("digit nibble {digit:#x}")));
                }
                value = value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add(i64::from(digit)))
                    .ok_or_else(|| invalid("value overflows i64".to_string()))?;
            }

            if i == last {
                return match low {
                    0x0A | 0x0C | 0x0E | 0x0F => Ok(value),
                    0x0B | 0x0D => Ok(-value),
                    other => Err(invalid(format!("sign nibble {other:#x}"))),
                };
            }
        }

        Err(invalid("empty field".to_string()))
    }
}
