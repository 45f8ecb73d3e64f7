//! Record streams.
//!
//! [`FramedRecordStream`] owns the byte layout and the position cursors.
//! [`RecordReader`] and [`RecordWriter`] pair a stream with a
//! [`RecordCodec`](rdwbatch_codec::RecordCodec).

pub mod frame;
mod framed;
mod reader;
mod writer;

pub use frame::{HEADER_SIZE, MAX_RECORD_LENGTH};
pub use framed::{FramedRecordStream, RawRecord, StreamRole};
pub use reader::{Record, RecordReader};
pub use writer::RecordWriter;
