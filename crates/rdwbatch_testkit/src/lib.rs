//! # rdwbatch Testkit
//!
//! Test utilities for rdwbatch.
//!
//! This crate provides:
//! - Test fixtures: temporary datasets and a fixed-layout test record
//! - Property-based test generators using proptest
//! - Corruption helpers that simulate crashed or damaged writers
//! - Fuzz testing harnesses
//! - Frame encoding test vectors
//!
//! ## Usage
//!
//! ```rust
//! use rdwbatch_testkit::prelude::*;
//!
//! let dataset = TestDataset::new();
//! dataset.write_records(&abc_records());
//! assert_eq!(dataset.read_records(), abc_records());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::vectors::*;
}

pub use crash::*;
pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use vectors::*;
