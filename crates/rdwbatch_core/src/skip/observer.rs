//! Skip observers.

use crate::skip::controller::ControllerState;
use crate::skip::failure::BoxError;
use crate::skip::policy::Limit;
use std::fmt;

/// Read-only view of a controller handed to observers.
///
/// Counters are the values before the current skip is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipStatus<'a> {
    /// Step the controller belongs to.
    pub step_id: &'a str,
    /// Controller state.
    pub state: ControllerState,
    /// Records skipped so far.
    pub skipped_records: u64,
    /// Failures tolerated so far.
    pub tolerated_failures: u64,
    /// Skip limit.
    pub max_skip_records: Limit,
    /// Tolerated failure limit.
    pub max_tolerated_failures: Limit,
}

/// Notified synchronously for every skipped record.
///
/// Observers run in registration order. An error returned here aborts the
/// unit of work and the skip is not counted.
pub trait SkipObserver<R> {
    /// Called with the skipped record before it is counted.
    ///
    /// # Errors
    ///
    /// Any error stops the remaining observers and fails the step.
    fn on_skip(&mut self, record: &R, status: &SkipStatus<'_>) -> Result<(), BoxError>;
}

impl<R, F> SkipObserver<R> for F
where
    F: FnMut(&R, &SkipStatus<'_>) -> Result<(), BoxError>,
{
    fn on_skip(&mut self, record: &R, status: &SkipStatus<'_>) -> Result<(), BoxError> {
        self(record, status)
    }
}

/// Logs every skipped record at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl<R: fmt::Debug> SkipObserver<R> for LogObserver {
    fn on_skip(&mut self, record: &R, status: &SkipStatus<'_>) -> Result<(), BoxError> {
        tracing::warn!(
            step = status.step_id,
            skipped = status.skipped_records,
            limit = %status.max_skip_records,
            record = ?record,
            "skipping record"
        );
        Ok(())
    }
}
