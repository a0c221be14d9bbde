//! Task status indicators.
//!
//! The indicator is the single source of truth for where a run sits in its
//! lifecycle. It is only ever updated by the lifecycle wrapper in
//! [`crate::task::TaskRun`], inside the same call that produced the
//! transition.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a task run.
///
/// # State Machine
/// ```text
/// Newborn -> Configured -> Initialised -> Running -> Completed
///                 \              \    \->    |   \-> Failed
///                  \-> Failed     \----------+-------> Terminated
/// ```
/// `Initialised`, `Running`, `Completed` and `Failed` all accept
/// `terminate()`, which always lands in `Terminated`.
///
/// The enumeration is non-exhaustive: the status message schema that
/// transports these values may define further indicators.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskIndicator {
    /// Freshly spawned, no lifecycle call made yet
    Newborn,
    /// Parameters validated, effective configuration snapshotted
    Configured,
    /// Runtime state set up, ready to iterate
    Initialised,
    /// Work in progress
    Running,
    /// Goal reached, no error
    Completed,
    /// Unrecoverable error; the status string explains why
    Failed,
    /// Resources released, run is quiescent
    Terminated,
}

impl TaskIndicator {
    /// Check if the run can make no further progress this run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskIndicator::Completed | TaskIndicator::Failed | TaskIndicator::Terminated
        )
    }

    /// Check if `iterate()` is a legal next call.
    pub fn accepts_iterate(&self) -> bool {
        matches!(self, TaskIndicator::Initialised | TaskIndicator::Running)
    }

    /// Check if `terminate()` is a legal next call.
    ///
    /// Notably legal from `Initialised`: a run cancelled before it ever
    /// iterated must still terminate cleanly.
    pub fn accepts_terminate(&self) -> bool {
        matches!(
            self,
            TaskIndicator::Initialised
                | TaskIndicator::Running
                | TaskIndicator::Completed
                | TaskIndicator::Failed
        )
    }
}

impl fmt::Display for TaskIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskIndicator::Newborn => "NEWBORN",
            TaskIndicator::Configured => "CONFIGURED",
            TaskIndicator::Initialised => "INITIALISED",
            TaskIndicator::Running => "RUNNING",
            TaskIndicator::Completed => "COMPLETED",
            TaskIndicator::Failed => "FAILED",
            TaskIndicator::Terminated => "TERMINATED",
            #[allow(unreachable_patterns)]
            _ => "UNKNOWN",
        };
        write!(f, "{label}")
    }
}
