//! Truncate command implementation.

use super::{dataset_path, is_stdio};
use rdwbatch_core::{FramedRecordStream, StreamConfig};
use rdwbatch_storage::{FileBackend, StorageBackend};

/// Runs the truncate command.
///
/// Only the first `at` frames are checked, so a damaged tail can be cut
/// away.
pub fn run(config: &StreamConfig, at: u64) -> Result<(), Box<dyn std::error::Error>> {
    let path = dataset_path(config)?;
    if is_stdio(path) {
        return Err("Cannot truncate standard input".into());
    }

    let backend = FileBackend::open_exclusive(path)?;
    let before = backend.size()?;
    let mut stream = FramedRecordStream::open(Box::new(backend), config)?;
    stream.truncate_at_record(at)?;
    stream.sync()?;

    println!("Truncated {} to {} records", path.display(), at);
    println!("  Before: {} bytes", before);
    println!("  After:  {} bytes", stream.offset());
    Ok(())
}
