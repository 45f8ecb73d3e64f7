//! Verify command implementation.

use super::open_input;
use rdwbatch_core::{CoreError, StreamConfig};

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of well-formed records.
    pub valid_records: u64,
    /// Bytes covered by well-formed records.
    pub valid_bytes: u64,
    /// First framing problem found.
    pub error: Option<CoreError>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the verify command.
pub fn run(config: &StreamConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Verifying {} ({}-byte records)",
        super::dataset_path(config)?.display(),
        config.record_length
    );
    println!();

    let mut stream = open_input(config)?;
    let mut result = VerifyResult::default();
    loop {
        match stream.read_next() {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(err) if err.is_framing() => {
                result.error = Some(err);
                break;
            }
            Err(err) => return Err(err.into()),
        }
        result.valid_records = stream.records();
        result.valid_bytes = stream.offset();
    }

    println!("  Valid records: {}", result.valid_records);
    println!("  Valid bytes:   {}", result.valid_bytes);
    if let Some(err) = &result.error {
        println!("  Error:         {}", err);
    }

    println!();
    if result.is_ok() {
        println!("✓ Dataset verification passed");
        Ok(())
    } else {
        println!("✗ Dataset verification failed");
        println!(
            "  `rdwbatch truncate --at {}` keeps the well-formed prefix",
            result.valid_records
        );
        Err("Verification failed".into())
    }
}
