//! Count command implementation.

use super::open_input;
use rdwbatch_core::StreamConfig;

/// Runs the count command.
pub fn run(config: &StreamConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = open_input(config)?;
    while stream.read_next()?.is_some() {}

    println!(
        "{} records ({} bytes, {} positioning)",
        stream.records(),
        stream.offset(),
        stream.mode()
    );
    Ok(())
}
