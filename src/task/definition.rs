//! The task contract: definitions, bodies, and the environment capability.
//!
//! A *definition* is the long-lived, immutable template for a task type
//! (identity, help text, schema, periodic flag). A *body* is the mutable
//! per-run state the definition spawns for each execution; it is driven
//! through its lifecycle by [`TaskRun`](crate::task::TaskRun), never called
//! directly.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::TaskParameters;
use crate::schema::ConfigDescription;
use crate::status::TaskIndicator;

/// The specific execution context a task acts on (a robot, a simulator, a
/// service connection). The framework treats it as an opaque capability;
/// tasks downcast it to the concrete type they need and fail fast at
/// construction when it does not match.
pub trait TaskEnvironment: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to the environment capability, passed to every task
/// factory.
pub type EnvironmentRef = Arc<dyn TaskEnvironment>;

/// Downcast the environment to the concrete capability a task expects.
pub fn downcast_environment<T: TaskEnvironment>(environment: &EnvironmentRef) -> Option<&T> {
    environment.as_any().downcast_ref::<T>()
}

/// Structurally invalid or out-of-range parameters, raised only from
/// `configure`/`initialise`.
///
/// This never crosses the lifecycle wrapper: [`TaskRun`](crate::task::TaskRun)
/// converts it into a `Failed` status carrying the message.
#[derive(Debug, Clone, Error)]
#[error("invalid parameter: {0}")]
pub struct InvalidParameter(pub String);

impl InvalidParameter {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Outcome of one `iterate` cycle.
///
/// Ordinary termination conditions (goal reached, unrecoverable error) are
/// values, never panics or faults, so the scheduler handles every failure
/// origin uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum Iteration {
    /// Work continues; for aperiodic tasks this means "started".
    Running,
    /// Goal reached, no error.
    Completed,
    /// Unrecoverable error during this cycle, with the reason.
    Failed(String),
}

impl Iteration {
    pub fn failed(reason: impl Into<String>) -> Self {
        Iteration::Failed(reason.into())
    }

    /// The status indicator this outcome maps to.
    pub fn indicator(&self) -> TaskIndicator {
        match self {
            Iteration::Running => TaskIndicator::Running,
            Iteration::Completed => TaskIndicator::Completed,
            Iteration::Failed(_) => TaskIndicator::Failed,
        }
    }
}

/// Definition-level identity and timing metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Display name; also the key the registry files the definition under.
    pub name: String,
    /// Help text, immutable per definition.
    pub help: String,
    /// Periodic tasks have `iterate` called repeatedly at `task_period`;
    /// aperiodic tasks have it called exactly once and may block until the
    /// work is done.
    pub periodic: bool,
    /// Default timeout in seconds; negative means unbounded. Advisory
    /// metadata for the scheduler, typically overridden by `task_timeout`.
    pub default_timeout: f64,
}

impl TaskDescriptor {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        periodic: bool,
        default_timeout: f64,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            periodic,
            default_timeout,
        }
    }
}

/// Per-run task behavior.
///
/// Implementations hold all runtime-mutable state for one execution. They
/// are only ever driven through [`TaskRun`](crate::task::TaskRun), which
/// enforces call order, so a body may assume `configure` comes first,
/// `initialise` before any `iterate`, and `terminate` exactly once.
///
/// # Rules
/// - `iterate` for periodic tasks must return promptly each cycle
///   (cooperative scheduling); aperiodic tasks may block in `iterate`
///   until the work is done.
/// - Parameters handed to `configure`/`initialise` are snapshots; copy out
///   anything needed past the call.
/// - `terminate` must release everything acquired since `initialise` and
///   must cope with being called before the first `iterate`.
pub trait TaskBody: Send {
    /// Validate parameters and snapshot whatever configure-time state the
    /// task keeps. Called exactly once per run, before anything else.
    fn configure(&mut self, params: &TaskParameters) -> Result<TaskIndicator, InvalidParameter> {
        let _ = params;
        Ok(TaskIndicator::Configured)
    }

    /// Set up runtime-mutable state. Called once per run, possibly with
    /// different parameters than configure time.
    fn initialise(&mut self, params: &TaskParameters) -> Result<TaskIndicator, InvalidParameter> {
        let _ = params;
        Ok(TaskIndicator::Initialised)
    }

    /// One work cycle. See [`Iteration`] for the outcome contract.
    fn iterate(&mut self) -> Iteration;

    /// Release resources and bring the task to a quiescent state.
    fn terminate(&mut self) {}
}

/// The immutable task template: identity, schema, and the prototype
/// operation producing fresh bodies for independent runs.
///
/// One definition is registered once (by name) yet supports many
/// concurrent or sequential runs: each [`spawn_body`](Self::spawn_body)
/// call returns an independent body carrying no state from any prior run.
pub trait TaskDefinition: Send + Sync {
    /// Identity and timing metadata.
    fn descriptor(&self) -> &TaskDescriptor;

    /// The configuration schema. Defaults to the empty schema for tasks
    /// with no configuration of their own.
    fn schema(&self) -> &ConfigDescription {
        ConfigDescription::empty()
    }

    /// The default parameters a run starts from: the base entries plus the
    /// schema's compiled defaults.
    fn default_parameters(&self) -> TaskParameters {
        let mut params = TaskParameters::with_defaults();
        params.merge(&self.schema().default_parameters());
        params
    }

    /// Produce a fresh, independent body for one run.
    ///
    /// Stateless tasks return a zero-sized body; tasks with iteration
    /// state return a structural copy of their template value. The body
    /// must not carry over status or bound parameters from any prior run.
    fn spawn_body(&self) -> Box<dyn TaskBody>;
}
