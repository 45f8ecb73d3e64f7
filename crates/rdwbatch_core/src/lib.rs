//! # rdwbatch Core
//!
//! Restartable record streams for batch steps.
//!
//! This crate provides:
//! - RDW-framed fixed-length record streams over any storage backend
//! - Restart positions by byte offset or by record replay
//! - A skip/tolerance controller for per-record failures
//! - A reader → processor → writer step with checkpoints
//! - Property-based configuration
//!
//! ## Example
//!
//! ```rust
//! use rdwbatch_codec::CborCodec;
//! use rdwbatch_core::{Checkpointable, Position, RecordReader, RecordWriter, StreamConfig};
//! use rdwbatch_storage::InMemoryBackend;
//!
//! let config = StreamConfig::new(16).large_dataset_support(true);
//! let codec = CborCodec::<(u32, String)>::new(16);
//!
//! let mut writer = RecordWriter::open(Box::new(InMemoryBackend::new()), &config, codec.clone()).unwrap();
//! writer.write(&(1, "a".to_string())).unwrap();
//! writer.write(&(2, "b".to_string())).unwrap();
//!
//! let mut reader = RecordReader::open(writer.into_stream().into_backend(), &config, codec).unwrap();
//! assert_eq!(reader.read_next().unwrap().unwrap().value.0, 1);
//! assert_eq!(reader.current_position().unwrap(), Position::RecordCount(1));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod error;
mod position;
pub mod skip;
mod step;
pub mod stream;

pub use config::{Properties, SkipConfig, StepConfig, StreamConfig};
pub use error::{CoreError, CoreResult};
pub use position::{Checkpointable, Position, PositioningMode, RestartToken};
pub use skip::{
    Failure, Limit, SkipController, SkipError, SkipPolicy, StepOutcome, StepStatus,
};
pub use step::{EtlStep, RecordProcessor, StepCheckpoint, StepSummary};
pub use stream::{FramedRecordStream, RawRecord, Record, RecordReader, RecordWriter, StreamRole};
