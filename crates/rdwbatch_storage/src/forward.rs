//! Forward-only storage backend over plain `Read`/`Write` handles.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Read, Write};

const BACKEND_NAME: &str = "forward-only";

enum Handle {
    Reader(Box<dyn Read + Send>),
    Writer(Box<dyn Write + Send>),
}

struct ForwardState {
    handle: Handle,
    /// Bytes consumed by readers, or written by `append`.
    cursor: u64,
    /// Bytes pulled from the reader but not yet consumed.
    pending: Vec<u8>,
    eof: bool,
}

impl ForwardState {
    /// Pulls from the reader until `pending` holds `len` bytes or EOF.
    fn fill(&mut self, len: usize) -> StorageResult<()> {
        let Handle::Reader(reader) = &mut self.handle else {
            return Err(StorageError::unsupported(BACKEND_NAME, "read from a write handle"));
        };

        let mut chunk = [0u8; 8192];
        while self.pending.len() < len && !self.eof {
            let want = (len - self.pending.len()).min(chunk.len());
            match reader.read(&mut chunk[..want]) {
                Ok(0) => self.eof = true,
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn check_cursor(&self, offset: u64) -> StorageResult<()> {
        if offset != self.cursor {
            return Err(StorageError::unsupported(
                BACKEND_NAME,
                format!("read at offset {offset} while positioned at {}", self.cursor),
            ));
        }
        Ok(())
    }

    fn consume(&mut self, len: usize) -> Vec<u8> {
        let data: Vec<u8> = self.pending.drain(..len).collect();
        self.cursor += len as u64;
        data
    }
}

/// A storage backend over a handle that can only move forward.
///
/// Wraps a plain [`Read`] (for input) or [`Write`] (for output) such as a
/// pipe, a tape device, or standard input. Reads must happen at the
/// current cursor and consume the bytes they return; writes can only append.
///
/// Record streams over this backend always use replay positioning: a
/// restart token is a record count, and restoring it consumes that many
/// records from the start of the handle.
///
/// # Example
///
/// ```rust
/// use rdwbatch_storage::{ForwardOnlyBackend, StorageBackend};
/// use std::io::Cursor;
///
/// let backend = ForwardOnlyBackend::reader(Cursor::new(b"abcdef".to_vec()));
/// assert!(!backend.is_seekable());
/// assert_eq!(backend.read_at(0, 2).unwrap(), b"ab");
/// assert!(backend.read_at(0, 2).is_err()); // already consumed
/// assert_eq!(backend.read_available(2, 10).unwrap(), b"cdef");
/// ```
pub struct ForwardOnlyBackend {
    state: Mutex<ForwardState>,
}

impl ForwardOnlyBackend {
    /// Wraps a readable handle.
    pub fn reader(reader: impl Read + Send + 'static) -> Self {
        Self::with_handle(Handle::Reader(Box::new(reader)))
    }

    /// Wraps a writable handle.
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Self::with_handle(Handle::Writer(Box::new(writer)))
    }

    fn with_handle(handle: Handle) -> Self {
        Self {
            state: Mutex::new(ForwardState {
                handle,
                cursor: 0,
                pending: Vec::new(),
                eof: false,
            }),
        }
    }

    /// Returns the number of bytes consumed or written so far.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.state.lock().cursor
    }
}

impl fmt::Debug for ForwardOnlyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let role = match state.handle {
            Handle::Reader(_) => "reader",
            Handle::Writer(_) => "writer",
        };
        f.debug_struct("ForwardOnlyBackend")
            .field("role", &role)
            .field("cursor", &state.cursor)
            .field("eof", &state.eof)
            .finish_non_exhaustive()
    }
}

impl StorageBackend for ForwardOnlyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut state = self.state.lock();
        state.check_cursor(offset)?;
        state.fill(len)?;

        if state.pending.len() < len {
            return Err(StorageError::ReadPastEnd {
                offset,
                len,
                size: state.cursor + state.pending.len() as u64,
            });
        }

        Ok(state.consume(len))
    }

    fn read_available(&self, offset: u64, max_len: usize) -> StorageResult<Vec<u8>> {
        let mut state = self.state.lock();
        state.check_cursor(offset)?;
        state.fill(max_len)?;

        let len = state.pending.len().min(max_len);
        Ok(state.consume(len))
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let state = self.state.get_mut();
        let Handle::Writer(writer) = &mut state.handle else {
            return Err(StorageError::unsupported(BACKEND_NAME, "append to a read handle"));
        };

        let offset = state.cursor;
        writer.write_all(data)?;
        state.cursor += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        if let Handle::Writer(writer) = &mut self.state.get_mut().handle {
            writer.flush()?;
        }
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        let state = self.state.lock();
        Ok(state.cursor + state.pending.len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.flush()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let size = self.size()?;
        if new_size == size {
            return Ok(());
        }
        Err(StorageError::unsupported(
            BACKEND_NAME,
            format!("truncate from {size} to {new_size} bytes"),
        ))
    }

    fn is_seekable(&self) -> bool {
        false
    }
}
