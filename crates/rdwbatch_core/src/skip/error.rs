//! Errors that end a step.

use crate::error::CoreError;
use crate::skip::controller::StepStatus;
use crate::skip::failure::{BoxError, Failure};
use std::fmt;
use thiserror::Error;

/// Which counter crossed its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    /// Skipped records.
    SkippedRecords,
    /// Tolerated failures.
    ToleratedFailures,
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SkippedRecords => "skipped records",
            Self::ToleratedFailures => "tolerated failures",
        })
    }
}

/// Result type for controller operations.
pub type SkipResult<T, R> = Result<T, SkipError<R>>;

/// A unit of work failed and the step must stop.
#[derive(Debug, Error)]
pub enum SkipError<R> {
    /// A counter reached its limit. Wraps the skip or failure that did it.
    #[error("limit of {limit} {kind} reached ({count}): {cause}")]
    ThresholdExceeded {
        /// Counter that reached its limit.
        kind: ThresholdKind,
        /// The configured limit.
        limit: u64,
        /// Count after the triggering occurrence.
        count: u64,
        /// The triggering skip or failure.
        cause: Box<Failure<R>>,
    },

    /// A failure that is neither a skip nor a tolerated kind.
    #[error("unit of work failed: {0}")]
    Failed(#[source] BoxError),

    /// An observer returned an error.
    #[error("skip observer failed: {0}")]
    ObserverFailed(#[source] BoxError),

    /// The controller is already fatal; the unit of work was not run.
    #[error("step already failed; no further units of work run")]
    Halted,
}

impl<R> SkipError<R> {
    /// Terminal status of the step.
    ///
    /// Configuration errors cannot be fixed by a restart; everything else
    /// leaves the step restartable from its last checkpoint.
    pub fn status(&self) -> StepStatus {
        match self {
            Self::Failed(err) => match err.downcast_ref::<CoreError>() {
                Some(core) => core.status(),
                None => StepStatus::Restartable,
            },
            _ => StepStatus::Restartable,
        }
    }

    /// Returns true for a threshold breach.
    pub fn is_threshold_exceeded(&self) -> bool {
        matches!(self, Self::ThresholdExceeded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn threshold_message_names_counter_and_cause() {
        let err = SkipError::ThresholdExceeded {
            kind: ThresholdKind::SkippedRecords,
            limit: 2,
            count: 2,
            cause: Box::new(Failure::skip_because(7u32, "blank record")),
        };
        assert_eq!(
            err.to_string(),
            "limit of 2 skipped records reached (2): record skipped: blank record"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn failed_exposes_source() {
        let err = SkipError::<u32>::Failed(Box::new(CoreError::framing(6, 1, "short frame")));
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<CoreError>().unwrap().is_framing());
        assert!(err.to_string().starts_with("unit of work failed: "));
    }
}
