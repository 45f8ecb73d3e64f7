//! # rdwbatch Storage
//!
//! Byte-store backends for rdwbatch record streams.
//!
//! Backends are **opaque byte stores**: they know nothing about record
//! descriptor words, record lengths, or restart tokens. The framed record
//! stream in `rdwbatch_core` owns all interpretation of the bytes.
//!
//! ## Design Principles
//!
//! - Backends are simple byte stores (read, append, flush, truncate)
//! - A backend reports whether it can be read at arbitrary offsets
//!   ([`StorageBackend::is_seekable`]); record streams fall back to
//!   sequential replay when it cannot
//! - Must be `Send + Sync` so a step can move between threads
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - Seekable storage using OS file APIs
//! - [`ForwardOnlyBackend`] - Append-only / read-once wrapper over plain
//!   `Read` and `Write` handles (pipes, tapes, sockets)
//!
//! ## Example
//!
//! ```rust
//! use rdwbatch_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod forward;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use forward::ForwardOnlyBackend;
pub use memory::InMemoryBackend;
