//! Reader → processor → writer batch step.
//!
//! An [`EtlStep`] moves records from a [`RecordReader`] through a
//! [`RecordProcessor`] into a [`RecordWriter`], a unit of work at a time.
//! Units run through a [`SkipController`]; after each unit the step's
//! [`StepCheckpoint`] can be persisted and later handed to
//! [`EtlStep::restart`].

use crate::config::{options, StepConfig};
use crate::error::{CoreError, CoreResult};
use crate::position::{Checkpointable, Position};
use crate::skip::{Failure, SkipController, SkipError, SkipRecord, SkipResult, StepOutcome};
use crate::stream::{RawRecord, RecordReader, RecordWriter};
use rdwbatch_codec::RecordCodec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Transforms one input record into one output record.
///
/// Return [`Failure::Skip`] with the input to skip the record, or any error
/// through `?`.
pub trait RecordProcessor<I, O> {
    /// Processes one record.
    ///
    /// # Errors
    ///
    /// A skip or an error, classified by the step's controller.
    fn process(&mut self, input: I) -> Result<O, Failure<I>>;
}

impl<I, O, F> RecordProcessor<I, O> for F
where
    F: FnMut(I) -> Result<O, Failure<I>>,
{
    fn process(&mut self, input: I) -> Result<O, Failure<I>> {
        self(input)
    }
}

/// Reader and writer positions after a completed unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCheckpoint {
    /// Input position.
    pub reader: Position,
    /// Output position.
    pub writer: Position,
}

/// Counters for one run of a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Units of work run.
    pub units: u64,
    /// Records read from the input, including skipped ones.
    pub records_read: u64,
    /// Records written to the output.
    pub records_written: u64,
    /// Records skipped.
    pub skipped_records: u64,
    /// Failures tolerated.
    pub tolerated_failures: u64,
}

/// A reader → processor → writer step.
///
/// Skips are reported against the raw input record, so observers see the
/// record index, its offset, and its bytes even when it did not decode.
pub struct EtlStep<RC, P, WC> {
    reader: RecordReader<RC>,
    processor: P,
    writer: RecordWriter<WC>,
    unit_of_work_size: usize,
    summary: StepSummary,
}

impl<RC, P, WC> EtlStep<RC, P, WC>
where
    RC: RecordCodec,
    WC: RecordCodec,
    P: RecordProcessor<RC::Value, WC::Value>,
{
    /// Creates a step processing `unit_of_work_size` records per unit.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `unit_of_work_size` is zero.
    pub fn new(
        reader: RecordReader<RC>,
        processor: P,
        writer: RecordWriter<WC>,
        unit_of_work_size: usize,
    ) -> CoreResult<Self> {
        if unit_of_work_size == 0 {
            return Err(CoreError::configuration(
                options::UNIT_OF_WORK_SIZE,
                "must be at least 1",
            ));
        }
        Ok(Self {
            reader,
            processor,
            writer,
            unit_of_work_size,
            summary: StepSummary::default(),
        })
    }

    /// Creates a step from a [`StepConfig`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the config is invalid.
    pub fn with_config(
        reader: RecordReader<RC>,
        processor: P,
        writer: RecordWriter<WC>,
        config: &StepConfig,
    ) -> CoreResult<Self> {
        config.validate()?;
        Self::new(reader, processor, writer, config.unit_of_work_size)
    }

    /// Records per unit of work.
    pub fn unit_of_work_size(&self) -> usize {
        self.unit_of_work_size
    }

    /// Counters so far. Skip counters are filled in by
    /// [`run_to_completion`](Self::run_to_completion).
    pub fn summary(&self) -> StepSummary {
        self.summary
    }

    /// The processor.
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Reads, processes, and writes up to `unit_of_work_size` records.
    ///
    /// Returns `Complete` once the input is exhausted. A failing record ends
    /// the unit early; records before it stay written and the next unit
    /// resumes after it.
    ///
    /// # Errors
    ///
    /// A record that does not decode or that the processor skips becomes a
    /// [`Failure::Skip`] of the raw record. Stream and codec errors become
    /// [`Failure::Error`].
    pub fn process_unit_of_work(&mut self) -> Result<StepOutcome, Failure<RawRecord>> {
        self.summary.units += 1;

        for _ in 0..self.unit_of_work_size {
            let offset = self.reader.stream().offset();
            let record = match self.reader.read_next() {
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.writer.flush()?;
                    return Ok(StepOutcome::Complete);
                }
                Err(CoreError::Decode {
                    index,
                    bytes,
                    source,
                }) => {
                    self.summary.records_read += 1;
                    let raw = RawRecord {
                        index,
                        offset,
                        bytes,
                    };
                    return Err(Failure::Skip(
                        SkipRecord::new(raw)
                            .with_reason("record does not decode")
                            .with_source(source),
                    ));
                }
                Err(err) => return Err(err.into()),
            };
            self.summary.records_read += 1;

            let raw = RawRecord {
                index: record.index,
                offset,
                bytes: record.bytes,
            };
            let output = self
                .processor
                .process(record.value)
                .map_err(|failure| failure.map_record(|_| raw))?;

            self.writer.write(&output)?;
            self.summary.records_written += 1;
        }

        self.writer.flush()?;
        Ok(StepOutcome::Continue)
    }

    /// Runs one unit of work through `controller`.
    ///
    /// # Errors
    ///
    /// Whatever the controller decides is fatal.
    pub fn run(&mut self, controller: &mut SkipController<RawRecord>) -> SkipResult<StepOutcome, RawRecord> {
        let outcome = controller.run_unit_of_work(|| self.process_unit_of_work())?;
        debug!(
            step = controller.step_id(),
            unit = self.summary.units,
            read = self.summary.records_read,
            written = self.summary.records_written,
            outcome = ?outcome,
            "unit of work finished"
        );
        Ok(outcome)
    }

    /// Runs units until the input is exhausted, calling `on_checkpoint`
    /// after every unit.
    ///
    /// # Errors
    ///
    /// Returns the controller's error, or [`SkipError::Failed`] if a
    /// checkpoint cannot be taken or persisted. The last checkpoint passed
    /// to `on_checkpoint` is the restart point.
    pub fn run_to_completion<F>(
        &mut self,
        controller: &mut SkipController<RawRecord>,
        mut on_checkpoint: F,
    ) -> SkipResult<StepSummary, RawRecord>
    where
        F: FnMut(&StepCheckpoint) -> CoreResult<()>,
    {
        loop {
            let outcome = self.run(controller)?;
            self.checkpoint()
                .and_then(|checkpoint| on_checkpoint(&checkpoint))
                .map_err(|err| SkipError::Failed(Box::new(err)))?;

            if outcome == StepOutcome::Complete {
                break;
            }
        }

        self.summary.skipped_records = controller.skipped_records();
        self.summary.tolerated_failures = controller.tolerated_failures();
        info!(
            step = controller.step_id(),
            read = self.summary.records_read,
            written = self.summary.records_written,
            skipped = self.summary.skipped_records,
            "step complete"
        );
        Ok(self.summary)
    }

    /// Current reader and writer positions.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered output cannot be flushed.
    pub fn checkpoint(&mut self) -> CoreResult<StepCheckpoint> {
        Ok(StepCheckpoint {
            reader: self.reader.current_position()?,
            writer: self.writer.current_position()?,
        })
    }

    /// Restores both streams to `checkpoint`.
    ///
    /// The reader is repositioned and output written after the checkpoint
    /// is cut away.
    ///
    /// # Errors
    ///
    /// Returns the reader's or writer's restore error.
    pub fn restart(&mut self, checkpoint: &StepCheckpoint) -> CoreResult<()> {
        self.reader.restore(checkpoint.reader)?;
        self.writer.restore(checkpoint.writer)?;
        info!(
            reader = %checkpoint.reader,
            writer = %checkpoint.writer,
            "restarted step from checkpoint"
        );
        Ok(())
    }

    /// Releases the reader, processor, and writer.
    pub fn into_parts(self) -> (RecordReader<RC>, P, RecordWriter<WC>) {
        (self.reader, self.processor, self.writer)
    }
}

impl<RC, P, WC> fmt::Debug for EtlStep<RC, P, WC>
where
    RC: RecordCodec,
    WC: RecordCodec,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtlStep")
            .field("reader", self.reader.stream())
            .field("writer", self.writer.stream())
            .field("unit_of_work_size", &self.unit_of_work_size)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}
