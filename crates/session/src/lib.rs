//! Changeover Run Session
//!
//! Run timer, per-operator step tracking, preparation checklist and the
//! session facade that keeps them consistent with the configuration.

#![warn(missing_docs)]

pub mod clock;
pub mod timer;
pub mod tracker;
pub mod prep;
pub mod options;
pub mod view;
pub mod session;
pub mod error;

pub use clock::{Clock, SystemClock, ManualClock};
pub use timer::{RunTimer, RunState, TimerStart};
pub use tracker::{OperatorProgressTracker, LaneState, Completion};
pub use prep::{PreparationStatus, PreparationProgress};
pub use options::SessionOptions;
pub use view::{LaneView, StepView, StepStatus, ObjectivesSummary, PhaseObjective};
pub use session::{Session, StartOutcome};
pub use error::{SessionError, Result};
