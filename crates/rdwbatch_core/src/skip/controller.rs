//! The skip/tolerance controller.

use crate::error::CoreError;
use crate::skip::error::{SkipError, SkipResult, ThresholdKind};
use crate::skip::failure::{BoxError, Failure, SkipRecord};
use crate::skip::observer::SkipStatus;
use crate::skip::policy::{FailureKind, Limit, SkipPolicy};
use std::fmt;
use tracing::{debug, warn};

/// Controller state.
///
/// `Running` until the first skip or tolerated failure, then `Degraded`.
/// `Fatal` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// No skips or tolerated failures yet.
    #[default]
    Running,
    /// Some skips or tolerated failures, all below their limits.
    Degraded,
    /// A limit was reached or a failure escaped; nothing more runs.
    Fatal,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Degraded => "degraded",
            Self::Fatal => "fatal",
        })
    }
}

/// What the step loop should do after a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// More work remains.
    Continue,
    /// The input is exhausted.
    Complete,
}

/// Terminal status reported to the batch container when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step can be restarted from its last checkpoint.
    Restartable,
    /// The step cannot succeed without a configuration change.
    Failed,
}

/// Runs units of work and decides whether failures are survivable.
///
/// Each call to [`run_unit_of_work`](Self::run_unit_of_work) runs one unit.
/// Its failure is classified as:
///
/// - a **skip**: observers are notified in order, then the skip is counted
///   against the skip limit;
/// - a **tolerated failure** (its error type was registered with the
///   policy): counted against the tolerated failure limit;
/// - anything else: returned as [`SkipError::Failed`].
///
/// Reaching a limit returns [`SkipError::ThresholdExceeded`]. Once a call
/// has failed the controller is `Fatal` and later calls return
/// [`SkipError::Halted`] without running the unit.
///
/// # Example
///
/// ```rust
/// use rdwbatch_core::skip::{Failure, Limit, SkipController, SkipPolicy, StepOutcome};
///
/// let policy = SkipPolicy::new().max_skip_records(Limit::AtMost(2));
/// let mut controller = SkipController::new("load", policy);
///
/// let outcome = controller.run_unit_of_work(|| Err(Failure::skip("bad record")));
/// assert_eq!(outcome.unwrap(), StepOutcome::Continue);
/// assert_eq!(controller.skipped_records(), 1);
///
/// let outcome = controller.run_unit_of_work(|| Err(Failure::skip("worse record")));
/// assert!(outcome.unwrap_err().is_threshold_exceeded());
/// ```
pub struct SkipController<R> {
    step_id: String,
    policy: SkipPolicy<R>,
    state: ControllerState,
    skipped: u64,
    tolerated: u64,
}

impl<R> SkipController<R> {
    /// Creates a controller for step `step_id`.
    pub fn new(step_id: impl Into<String>, policy: SkipPolicy<R>) -> Self {
        Self {
            step_id: step_id.into(),
            policy,
            state: ControllerState::Running,
            skipped: 0,
            tolerated: 0,
        }
    }

    /// Step identifier used in log lines.
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Records skipped so far.
    pub fn skipped_records(&self) -> u64 {
        self.skipped
    }

    /// Failures tolerated so far.
    pub fn tolerated_failures(&self) -> u64 {
        self.tolerated
    }

    /// The policy in force.
    pub fn policy(&self) -> &SkipPolicy<R> {
        &self.policy
    }

    /// Snapshot of the controller as observers see it.
    pub fn status(&self) -> SkipStatus<'_> {
        SkipStatus {
            step_id: &self.step_id,
            state: self.state,
            skipped_records: self.skipped,
            tolerated_failures: self.tolerated,
            max_skip_records: self.policy.max_skip_records,
            max_tolerated_failures: self.policy.max_tolerated_failures,
        }
    }

    /// Runs one unit of work.
    ///
    /// Returns the unit's outcome on success and `Continue` after a skip or
    /// tolerated failure below its limit.
    ///
    /// # Errors
    ///
    /// See the type-level documentation for the classification. The
    /// controller is `Fatal` after any error.
    pub fn run_unit_of_work<F>(&mut self, f: F) -> SkipResult<StepOutcome, R>
    where
        F: FnOnce() -> Result<StepOutcome, Failure<R>>,
    {
        if self.state == ControllerState::Fatal {
            return Err(SkipError::Halted);
        }

        let result = match f() {
            Ok(outcome) => return Ok(outcome),
            Err(Failure::Skip(skip)) => self.on_skip(skip),
            Err(Failure::Error(err)) if is_framing(&err) => {
                warn!(step = %self.step_id, error = %err, "framing error is never tolerated");
                Err(SkipError::Failed(err))
            }
            Err(Failure::Error(err)) => match self.policy.tolerated_kind(err.as_ref()) {
                Some(kind) => self.on_tolerated(kind, err),
                None => Err(SkipError::Failed(err)),
            },
        };

        if result.is_err() {
            self.state = ControllerState::Fatal;
        }
        result
    }

    fn on_skip(&mut self, skip: SkipRecord<R>) -> SkipResult<StepOutcome, R> {
        let status = SkipStatus {
            step_id: &self.step_id,
            state: self.state,
            skipped_records: self.skipped,
            tolerated_failures: self.tolerated,
            max_skip_records: self.policy.max_skip_records,
            max_tolerated_failures: self.policy.max_tolerated_failures,
        };

        for observer in &mut self.policy.observers {
            observer
                .on_skip(skip.record(), &status)
                .map_err(SkipError::ObserverFailed)?;
        }

        self.skipped += 1;
        let limit = self.policy.max_skip_records;

        if let Limit::AtMost(max) = limit {
            if limit.is_reached(self.skipped) {
                warn!(
                    step = %self.step_id,
                    skipped = self.skipped,
                    limit = max,
                    reason = %skip,
                    "skip limit reached"
                );
                return Err(SkipError::ThresholdExceeded {
                    kind: ThresholdKind::SkippedRecords,
                    limit: max,
                    count: self.skipped,
                    cause: Box::new(Failure::Skip(skip)),
                });
            }
        }

        self.state = ControllerState::Degraded;
        warn!(
            step = %self.step_id,
            skipped = self.skipped,
            limit = %limit,
            reason = %skip,
            "record skipped"
        );
        Ok(StepOutcome::Continue)
    }

    fn on_tolerated(&mut self, kind: FailureKind, err: BoxError) -> SkipResult<StepOutcome, R> {
        self.tolerated += 1;
        let limit = self.policy.max_tolerated_failures;

        if let Limit::AtMost(max) = limit {
            if limit.is_reached(self.tolerated) {
                warn!(
                    step = %self.step_id,
                    tolerated = self.tolerated,
                    limit = max,
                    kind = kind.name(),
                    error = %err,
                    "tolerated failure limit reached"
                );
                return Err(SkipError::ThresholdExceeded {
                    kind: ThresholdKind::ToleratedFailures,
                    limit: max,
                    count: self.tolerated,
                    cause: Box::new(Failure::Error(err)),
                });
            }
        }

        self.state = ControllerState::Degraded;
        warn!(
            step = %self.step_id,
            tolerated = self.tolerated,
            limit = %limit,
            kind = kind.name(),
            error = %err,
            "tolerated failure"
        );
        debug!(step = %self.step_id, state = %self.state, "continuing after failure");
        Ok(StepOutcome::Continue)
    }
}

/// A damaged frame leaves the reader where it was, so retrying it can only
/// fail again.
fn is_framing(err: &BoxError) -> bool {
    err.downcast_ref::<CoreError>().is_some_and(CoreError::is_framing)
}

impl<R> fmt::Debug for SkipController<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipController")
            .field("step_id", &self.step_id)
            .field("state", &self.state)
            .field("skipped", &self.skipped)
            .field("tolerated", &self.tolerated)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use rdwbatch_codec::CodecError;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn skip(record: u32) -> impl FnOnce() -> Result<StepOutcome, Failure<u32>> {
        move || Err(Failure::skip(record))
    }

    fn fail(err: impl std::error::Error + Send + Sync + 'static) -> impl FnOnce() -> Result<StepOutcome, Failure<u32>> {
        move || Err(Failure::from(err))
    }

    #[test]
    fn success_passes_outcome_through() {
        let mut controller = SkipController::<u32>::new("t", SkipPolicy::new());
        assert_eq!(
            controller.run_unit_of_work(|| Ok(StepOutcome::Complete)).unwrap(),
            StepOutcome::Complete
        );
        assert_eq!(controller.state(), ControllerState::Running);
    }

    #[test]
    fn nth_skip_is_fatal() {
        for n in 1..=5u64 {
            let policy = SkipPolicy::new().max_skip_records(Limit::AtMost(n));
            let mut controller = SkipController::new("t", policy);

            for i in 1..n {
                assert_eq!(
                    controller.run_unit_of_work(skip(i as u32)).unwrap(),
                    StepOutcome::Continue
                );
                assert_eq!(controller.state(), ControllerState::Degraded);
            }

            match controller.run_unit_of_work(skip(99)) {
                Err(SkipError::ThresholdExceeded {
                    kind: ThresholdKind::SkippedRecords,
                    limit,
                    count,
                    cause,
                }) => {
                    assert_eq!(limit, n);
                    assert_eq!(count, n);
                    match *cause {
                        Failure::Skip(skip) => assert_eq!(*skip.record(), 99),
                        Failure::Error(err) => panic!("unexpected cause {err}"),
                    }
                }
                other => panic!("expected threshold, got {other:?}"),
            }
            assert_eq!(controller.state(), ControllerState::Fatal);
        }
    }

    #[test]
    fn zero_limit_fails_first_skip() {
        let policy = SkipPolicy::new().max_skip_records(Limit::AtMost(0));
        let mut controller = SkipController::new("t", policy);
        assert!(controller.run_unit_of_work(skip(1)).unwrap_err().is_threshold_exceeded());
    }

    #[test]
    fn unlimited_never_fatal() {
        let mut controller = SkipController::new("t", SkipPolicy::new());
        for i in 0..10_000 {
            assert_eq!(controller.run_unit_of_work(skip(i)).unwrap(), StepOutcome::Continue);
        }
        assert_eq!(controller.skipped_records(), 10_000);
        assert_eq!(controller.state(), ControllerState::Degraded);
    }

    #[test]
    fn fatal_controller_halts_without_running() {
        let policy = SkipPolicy::new().max_skip_records(Limit::AtMost(1));
        let mut controller = SkipController::new("t", policy);
        controller.run_unit_of_work(skip(1)).unwrap_err();

        let mut ran = false;
        let result = controller.run_unit_of_work(|| {
            ran = true;
            Ok(StepOutcome::Continue)
        });
        assert!(matches!(result, Err(SkipError::Halted)));
        assert!(!ran);
    }

    #[test]
    fn observers_run_in_order_before_counting() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&log);
        let second = Arc::clone(&log);

        let policy = SkipPolicy::new()
            .observe_fn(move |record: &u32, status: &SkipStatus<'_>| {
                first.lock().unwrap().push(format!("O1:{record}:{}", status.skipped_records));
                Ok(())
            })
            .observe_fn(move |record: &u32, _: &SkipStatus<'_>| {
                second.lock().unwrap().push(format!("O2:{record}"));
                Ok(())
            });
        let mut controller = SkipController::new("t", policy);

        controller.run_unit_of_work(skip(7)).unwrap();
        controller.run_unit_of_work(skip(8)).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec!["O1:7:0", "O2:7", "O1:8:1", "O2:8"]
        );
    }

    #[test]
    fn observer_error_propagates_uncounted() {
        let calls = Arc::new(Mutex::new(0));
        let later = Arc::clone(&calls);
        let policy = SkipPolicy::new()
            .observe_fn(|_: &u32, _: &SkipStatus<'_>| Err("audit store offline".into()))
            .observe_fn(move |_: &u32, _: &SkipStatus<'_>| {
                *later.lock().unwrap() += 1;
                Ok(())
            });
        let mut controller = SkipController::new("t", policy);

        let err = controller.run_unit_of_work(skip(1)).unwrap_err();
        assert!(matches!(err, SkipError::ObserverFailed(_)));
        assert_eq!(controller.skipped_records(), 0);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn tolerated_kind_continues_until_limit() {
        let policy = SkipPolicy::new()
            .tolerate::<io::Error>()
            .max_tolerated_failures(Limit::AtMost(2));
        let mut controller = SkipController::new("t", policy);

        assert_eq!(
            controller.run_unit_of_work(fail(io::Error::other("flaky"))).unwrap(),
            StepOutcome::Continue
        );
        assert_eq!(controller.tolerated_failures(), 1);

        let err = controller.run_unit_of_work(fail(io::Error::other("flaky"))).unwrap_err();
        assert!(matches!(
            err,
            SkipError::ThresholdExceeded {
                kind: ThresholdKind::ToleratedFailures,
                count: 2,
                ..
            }
        ));
        assert_eq!(err.status(), StepStatus::Restartable);
    }

    #[test]
    fn untolerated_failure_is_fatal() {
        let policy = SkipPolicy::new().tolerate::<io::Error>();
        let mut controller = SkipController::new("t", policy);

        let err = controller
            .run_unit_of_work(fail(CodecError::decoding_failed("bad")))
            .unwrap_err();
        assert!(matches!(err, SkipError::Failed(_)));
        assert_eq!(controller.tolerated_failures(), 0);
        assert_eq!(controller.state(), ControllerState::Fatal);
    }

    #[test]
    fn wrapped_tolerated_kind_is_not_tolerated() {
        let policy = SkipPolicy::new().tolerate::<io::Error>();
        let mut controller = SkipController::new("t", policy);
        let err = controller
            .run_unit_of_work(fail(CoreError::from(io::Error::other("inner"))))
            .unwrap_err();
        assert!(matches!(err, SkipError::Failed(_)));
    }

    #[test]
    fn framing_error_fails_even_when_core_errors_are_tolerated() {
        let policy = SkipPolicy::new().tolerate::<CoreError>();
        let mut controller = SkipController::new("t", policy);

        assert_eq!(
            controller
                .run_unit_of_work(fail(CoreError::invalid_operation("retry me")))
                .unwrap(),
            StepOutcome::Continue
        );

        let err = controller
            .run_unit_of_work(fail(CoreError::framing(6, 1, "truncated payload")))
            .unwrap_err();
        assert!(matches!(err, SkipError::Failed(_)));
        assert_eq!(err.status(), StepStatus::Restartable);
        assert_eq!(controller.tolerated_failures(), 1);
        assert_eq!(controller.state(), ControllerState::Fatal);
    }

    #[test]
    fn configuration_failure_is_not_restartable() {
        let mut controller = SkipController::<u32>::new("t", SkipPolicy::new());
        let err = controller
            .run_unit_of_work(fail(CoreError::configuration("RECORD_LENGTH", "missing")))
            .unwrap_err();
        assert_eq!(err.status(), StepStatus::Failed);
    }
}
