//! Skip/tolerance control for per-record failures.
//!
//! A [`SkipController`] wraps each unit of work. Units report a bad record
//! with [`Failure::Skip`]; any other error converts into [`Failure::Error`]
//! with `?`. The controller notifies [`SkipObserver`]s, counts skips and
//! tolerated failures against the [`SkipPolicy`] limits, and turns fatal
//! when a limit is reached.

mod controller;
mod error;
mod failure;
mod observer;
mod policy;
mod registry;

pub use controller::{ControllerState, SkipController, StepOutcome, StepStatus};
pub use error::{SkipError, SkipResult, ThresholdKind};
pub use failure::{BoxError, Failure, SkipRecord};
pub use observer::{LogObserver, SkipObserver, SkipStatus};
pub use policy::{FailureKind, Limit, SkipPolicy};
pub use registry::{FailureKindRegistry, ObserverRegistry};
