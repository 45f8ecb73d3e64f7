//! Copy command implementation.
//!
//! Runs an [`EtlStep`] from the input dataset to the output dataset,
//! checkpointing after every unit of work so an interrupted copy can be
//! resumed with the same `--checkpoint` file.

use super::{dataset_path, is_stdio, open_input, DatasetArgs};
use clap::Args;
use rdwbatch_codec::RawCodec;
use rdwbatch_core::config::options;
use rdwbatch_core::skip::{FailureKindRegistry, ObserverRegistry};
use rdwbatch_core::{
    CoreResult, EtlStep, Failure, FramedRecordStream, Position, Properties, RecordProcessor,
    RecordReader, RecordWriter, SkipConfig, SkipController, SkipPolicy, StepCheckpoint, StepConfig,
    StepSummary, StreamConfig,
};
use rdwbatch_storage::{FileBackend, ForwardOnlyBackend, StorageBackend};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Options for the copy command.
#[derive(Args, Debug, Clone)]
pub struct CopyArgs {
    /// Input dataset
    #[command(flatten)]
    pub input: DatasetArgs,

    /// Output dataset (`-` for standard output)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Records per unit of work
    #[arg(short, long)]
    pub unit_of_work_size: Option<usize>,

    /// Skipped records allowed before the copy fails (-1 for unlimited)
    #[arg(long, allow_hyphen_values = true)]
    pub max_skip_records: Option<i64>,

    /// Skip-record observers to notify, in order
    #[arg(long = "observer")]
    pub observers: Vec<String>,

    /// Skip records whose payload is all blanks or zeros
    #[arg(long)]
    pub skip_blank: bool,

    /// Checkpoint file used to resume an interrupted copy
    #[arg(short, long)]
    pub checkpoint: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl CopyArgs {
    /// Overlays these flags on `properties`.
    pub fn apply(&self, properties: &mut Properties) {
        self.input.apply(properties);
        if let Some(size) = self.unit_of_work_size {
            properties.set(options::UNIT_OF_WORK_SIZE, size.to_string());
        }
        if let Some(limit) = self.max_skip_records {
            properties.set(options::MAX_SKIP_RECORDS, limit.to_string());
        }
        if !self.observers.is_empty() {
            properties.set_list(options::SKIP_RECORD_OBSERVER, self.observers.iter().cloned());
        }
    }
}

/// Passes records through unchanged, optionally skipping blank ones.
#[derive(Debug, Clone, Copy)]
struct PassThrough {
    skip_blank: bool,
}

impl RecordProcessor<Vec<u8>, Vec<u8>> for PassThrough {
    fn process(&mut self, bytes: Vec<u8>) -> Result<Vec<u8>, Failure<Vec<u8>>> {
        if self.skip_blank && is_blank(&bytes) {
            return Err(Failure::skip_because(bytes, "blank record"));
        }
        Ok(bytes)
    }
}

/// Blank in ASCII (0x20), EBCDIC (0x40), or zero-filled.
fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == b' ' || b == 0x40 || b == 0x00)
}

/// Runs the copy command.
pub fn run(properties: &Properties, args: &CopyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut properties = properties.clone();
    args.apply(&mut properties);

    let input_config = StreamConfig::from_properties(&properties)?;
    let output_config = StreamConfig::new(input_config.record_length)
        .file_name(&args.output)
        .large_dataset_support(input_config.large_dataset_support);
    let step_config = StepConfig::from_properties(&properties)?.step_id("copy");
    let skip_config = SkipConfig::from_properties(&properties)?;
    let policy = SkipPolicy::from_config(
        &skip_config,
        &ObserverRegistry::with_builtins(),
        &FailureKindRegistry::with_builtins(),
    )?;

    let checkpoint = match &args.checkpoint {
        Some(path) => load_checkpoint(path)?,
        None => None,
    };

    let codec = RawCodec::new(input_config.record_length);
    let reader = RecordReader::new(open_input(&input_config)?, codec)?;
    let output = open_output(&output_config, checkpoint.map(|c| c.writer))?;
    if checkpoint.is_none() && output.records() > 0 {
        return Err(format!(
            "Output {} already holds {} records; pass the copy's --checkpoint to resume",
            args.output.display(),
            output.records()
        )
        .into());
    }
    let writer = RecordWriter::new(output, codec)?;

    let processor = PassThrough {
        skip_blank: args.skip_blank,
    };
    let mut step = EtlStep::with_config(reader, processor, writer, &step_config)?;
    if let Some(checkpoint) = &checkpoint {
        info!(reader = %checkpoint.reader, writer = %checkpoint.writer, "resuming copy");
        step.restart(checkpoint)?;
    }

    let mut controller = SkipController::new(step_config.step_id.clone(), policy);
    let result = step.run_to_completion(&mut controller, |checkpoint| match &args.checkpoint {
        Some(path) => save_checkpoint(path, checkpoint),
        None => Ok(()),
    });

    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("✗ Copy failed ({:?}): {}", err.status(), err);
            if let Some(path) = &args.checkpoint {
                eprintln!("  Last checkpoint: {}", path.display());
            }
            return Err(err.to_string().into());
        }
    };

    if let Some(path) = &args.checkpoint {
        if path.exists() {
            fs::remove_file(path)?;
        }
    }

    // Keep standard output clean when the records go there.
    let report: fn(String) = if is_stdio(&args.output) {
        |line: String| eprintln!("{}", line)
    } else {
        |line: String| println!("{}", line)
    };
    match args.format.as_str() {
        "json" => report(serde_json::to_string_pretty(&summary)?),
        _ => print_summary(&summary, report),
    }

    Ok(())
}

fn print_summary(summary: &StepSummary, report: fn(String)) {
    report("✓ Copy complete".to_string());
    report(format!("  Units of work:      {}", summary.units));
    report(format!("  Records read:       {}", summary.records_read));
    report(format!("  Records written:    {}", summary.records_written));
    report(format!("  Records skipped:    {}", summary.skipped_records));
    report(format!("  Failures tolerated: {}", summary.tolerated_failures));
}

fn open_output(
    config: &StreamConfig,
    resume_at: Option<Position>,
) -> Result<FramedRecordStream, Box<dyn std::error::Error>> {
    let path = dataset_path(config)?;
    let backend: Box<dyn StorageBackend> = if is_stdio(path) {
        Box::new(ForwardOnlyBackend::writer(io::stdout()))
    } else {
        Box::new(FileBackend::open_exclusive(path)?)
    };
    let stream = match resume_at {
        Some(position) => FramedRecordStream::resume_writer(backend, config, position)?,
        None => FramedRecordStream::open_writer(backend, config)?,
    };
    Ok(stream)
}

/// Reads a checkpoint file, if one exists.
pub fn load_checkpoint(path: &Path) -> Result<Option<StepCheckpoint>, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

/// Writes `checkpoint` to `path`, replacing the previous one atomically.
pub fn save_checkpoint(path: &Path, checkpoint: &StepCheckpoint) -> CoreResult<()> {
    let json = serde_json::to_vec_pretty(checkpoint).map_err(io::Error::from)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdwbatch_core::PositioningMode;
    use tempfile::TempDir;

    fn write_input(path: &Path, payloads: &[&[u8; 4]]) {
        let config = StreamConfig::new(4);
        let backend = FileBackend::open(path).unwrap();
        let mut stream = FramedRecordStream::open_writer(Box::new(backend), &config).unwrap();
        for payload in payloads {
            stream.write(&payload[..]).unwrap();
        }
        stream.sync().unwrap();
    }

    fn count_records(path: &Path) -> u64 {
        let backend = FileBackend::open_read_only(path).unwrap();
        let mut stream = FramedRecordStream::open(Box::new(backend), &StreamConfig::new(4)).unwrap();
        while stream.read_next().unwrap().is_some() {}
        stream.records()
    }

    fn copy_args(dir: &TempDir) -> CopyArgs {
        CopyArgs {
            input: DatasetArgs {
                file: Some(dir.path().join("in.dat")),
                record_length: Some(4),
                large_dataset_support: false,
            },
            output: dir.path().join("out.dat"),
            unit_of_work_size: Some(2),
            max_skip_records: None,
            observers: Vec::new(),
            skip_blank: false,
            checkpoint: Some(dir.path().join("copy.ckpt")),
            format: "text".to_string(),
        }
    }

    #[test]
    fn blank_payloads() {
        assert!(is_blank(b"    "));
        assert!(is_blank(&[0x40, 0x40, 0x00]));
        assert!(!is_blank(b"  a "));
    }

    #[test]
    fn pass_through_skips_blank_only_when_asked() {
        let mut keep = PassThrough { skip_blank: false };
        assert_eq!(keep.process(b"    ".to_vec()).unwrap(), b"    ".to_vec());

        let mut skip = PassThrough { skip_blank: true };
        assert!(skip.process(b"    ".to_vec()).unwrap_err().is_skip());
        assert_eq!(skip.process(b"abcd".to_vec()).unwrap(), b"abcd".to_vec());
    }

    #[test]
    fn observer_flags_replace_properties_file_observers() {
        let dir = TempDir::new().unwrap();
        let mut args = copy_args(&dir);
        args.observers = vec!["log".to_string()];

        let mut props = Properties::new()
            .with(options::SKIP_RECORD_OBSERVER, "audit")
            .with(format!("{}.2", options::SKIP_RECORD_OBSERVER), "stale");
        args.apply(&mut props);

        let skip = SkipConfig::from_properties(&props).unwrap();
        assert_eq!(skip.observers, vec!["log".to_string()]);

        let mut props = Properties::new().with(options::SKIP_RECORD_OBSERVER, "audit");
        copy_args(&dir).apply(&mut props);
        assert_eq!(SkipConfig::from_properties(&props).unwrap().observers, vec!["audit".to_string()]);
    }

    #[test]
    fn checkpoint_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("step.ckpt");
        assert!(load_checkpoint(&path).unwrap().is_none());

        let checkpoint = StepCheckpoint {
            reader: Position::new(PositioningMode::ByteOffset, 12),
            writer: Position::new(PositioningMode::ByteOffset, 6),
        };
        save_checkpoint(&path, &checkpoint).unwrap();
        assert_eq!(load_checkpoint(&path).unwrap(), Some(checkpoint));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn copy_skips_blank_records() {
        let dir = TempDir::new().unwrap();
        write_input(&dir.path().join("in.dat"), &[b"aaaa", b"    ", b"cccc"]);

        let mut args = copy_args(&dir);
        args.skip_blank = true;
        run(&Properties::new(), &args).unwrap();

        assert_eq!(count_records(&args.output), 2);
        assert!(!dir.path().join("copy.ckpt").exists());
    }

    #[test]
    fn copy_fails_past_skip_limit() {
        let dir = TempDir::new().unwrap();
        write_input(&dir.path().join("in.dat"), &[b"    ", b"aaaa", b"    "]);

        let mut args = copy_args(&dir);
        args.skip_blank = true;
        args.max_skip_records = Some(2);
        assert!(run(&Properties::new(), &args).is_err());
        assert!(dir.path().join("copy.ckpt").exists());
        assert_eq!(count_records(&args.output), 1);
    }

    #[test]
    fn copy_resumes_from_checkpoint() {
        let dir = TempDir::new().unwrap();
        write_input(&dir.path().join("in.dat"), &[b"aaaa", b"bbbb", b"cccc"]);
        let args = copy_args(&dir);

        // Checkpointed after one record; the second was torn by a crash.
        write_input(&args.output, &[b"aaaa"]);
        let checkpoint = StepCheckpoint {
            reader: Position::new(PositioningMode::ByteOffset, 6),
            writer: Position::new(PositioningMode::ByteOffset, 6),
        };
        save_checkpoint(args.checkpoint.as_deref().unwrap(), &checkpoint).unwrap();
        write_input(&args.output, &[b"bbbb"]);
        let torn = fs::OpenOptions::new().write(true).open(&args.output).unwrap();
        torn.set_len(9).unwrap();
        drop(torn);

        run(&Properties::new(), &args).unwrap();
        assert_eq!(count_records(&args.output), 3);
    }

    #[test]
    fn copy_refuses_non_empty_output_without_checkpoint() {
        let dir = TempDir::new().unwrap();
        write_input(&dir.path().join("in.dat"), &[b"aaaa"]);
        let args = copy_args(&dir);
        write_input(&args.output, &[b"zzzz"]);

        assert!(run(&Properties::new(), &args).is_err());
        assert_eq!(count_records(&args.output), 1);
    }
}
