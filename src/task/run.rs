//! One task run: the lifecycle wrapper around a spawned body.
//!
//! Every lifecycle call a scheduler makes goes through [`TaskRun`], which
//! (1) asserts the call is legal for the current state, (2) invokes the
//! body, (3) updates the status indicator from the result, and (4) converts
//! an [`InvalidParameter`] failure into a `Failed` status carrying the
//! message. This wrapper is the only place that failure kind is observed;
//! it never propagates past it.
//!
//! # Invariants
//! - Status observed after a lifecycle call reflects exactly that call's
//!   outcome.
//! - A `Failed` status always carries a non-empty status string.
//! - Exactly one lifecycle call is in flight per run at a time (the run is
//!   `&mut self` throughout; distinct runs may live on separate threads).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::params::{TaskParameters, MAIN_TASK, TASK_PERIOD, TASK_RENAME, TASK_TIMEOUT};
use crate::status::TaskIndicator;
use crate::task::definition::{InvalidParameter, Iteration, TaskBody, TaskDefinition};
use crate::task::report::TaskStatusReport;

/// Unique identifier of one run, disambiguating concurrently running
/// instances of the same definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// A fresh ID never used before in this process.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Usage errors: a lifecycle method called out of state-machine order.
///
/// These are programmer-caused and fail fast; they are not part of the
/// recoverable taxonomy and do not touch the run's status.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("{call}() is not legal from state {from}")]
    InvalidTransition {
        call: &'static str,
        from: TaskIndicator,
    },
}

/// A spawned, independently mutable execution of a task definition.
///
/// Produced by [`TaskRun::spawn`]; carries the definition's task id and
/// name but none of any prior run's mutable state. Runs do not outlive one
/// execution: after `terminate` completes the run is discarded and a new
/// one is spawned for the next execution.
pub struct TaskRun {
    task_id: u32,
    run_id: RunId,
    name: String,
    periodic: bool,
    timeout: f64,
    status: TaskIndicator,
    status_string: String,
    config: TaskParameters,
    updated_at: DateTime<Utc>,
    body: Box<dyn TaskBody>,
}

impl fmt::Debug for TaskRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRun")
            .field("task_id", &self.task_id)
            .field("run_id", &self.run_id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("status_string", &self.status_string)
            .finish_non_exhaustive()
    }
}

impl TaskRun {
    /// Spawn a fresh run from a definition.
    ///
    /// `task_id` is the definition-level identifier assigned by whatever
    /// registered the task (see [`TaskRegistry`](crate::registry::TaskRegistry));
    /// the run id is assigned here and is unique per run.
    pub fn spawn(definition: &dyn TaskDefinition, task_id: u32) -> Self {
        let descriptor = definition.descriptor();
        Self {
            task_id,
            run_id: RunId::new(),
            name: descriptor.name.clone(),
            periodic: descriptor.periodic,
            timeout: descriptor.default_timeout,
            status: TaskIndicator::Newborn,
            status_string: String::new(),
            config: TaskParameters::new(),
            updated_at: Utc::now(),
            body: definition.spawn_body(),
        }
    }

    // Read-only views. None of these mutate the run.

    pub fn task_id(&self) -> u32 {
        self.task_id
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Current name; may differ from the definition's if `task_rename`
    /// was set at configure time.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Timeout in seconds, negative = unbounded. Advisory metadata;
    /// enforcing it is the scheduler's job.
    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    /// Iteration period in seconds, from the configured `task_period`.
    pub fn period(&self) -> f64 {
        self.config.get::<f64>(TASK_PERIOD).unwrap_or(1.0)
    }

    /// The main/foreground flag, from the configured `main_task`.
    pub fn is_main(&self) -> bool {
        self.config.get::<bool>(MAIN_TASK).unwrap_or(true)
    }

    pub fn status(&self) -> TaskIndicator {
        self.status
    }

    /// Free-form diagnostic text; non-empty whenever status is `Failed`.
    pub fn status_string(&self) -> &str {
        &self.status_string
    }

    /// The effective configuration snapshotted at configure time.
    pub fn config(&self) -> &TaskParameters {
        &self.config
    }

    /// Status snapshot suitable for publishing, derivable at any time.
    pub fn status_report(&self) -> TaskStatusReport {
        TaskStatusReport {
            task_id: self.task_id,
            run_id: self.run_id,
            name: self.name.clone(),
            status: self.status,
            status_string: self.status_string.clone(),
            updated_at: self.updated_at,
        }
    }

    // Lifecycle. Each call validates the state machine edge, drives the
    // body, and records the outcome before returning.

    /// Validate parameters and snapshot the effective configuration.
    ///
    /// Legal only from `Newborn`. Applies the base parameters
    /// (`task_rename`, `task_timeout`) to the run itself. An
    /// [`InvalidParameter`] from the body lands as `Failed` with the
    /// reason in the status string; the returned indicator tells which.
    ///
    /// # Errors
    /// [`LifecycleError::InvalidTransition`] when called out of order.
    pub fn configure(
        &mut self,
        params: &TaskParameters,
    ) -> Result<TaskIndicator, LifecycleError> {
        self.expect("configure", self.status == TaskIndicator::Newborn)?;
        self.status_string.clear();

        if let Some(rename) = params.get::<String>(TASK_RENAME) {
            if !rename.is_empty() {
                tracing::debug!(task = %self.name, renamed = %rename, "Task renamed via task_rename");
                self.name = rename;
            }
        }
        if let Some(timeout) = params.get::<f64>(TASK_TIMEOUT) {
            self.timeout = timeout;
        }
        self.config = params.clone();

        match self.body.configure(params) {
            Ok(indicator) => Ok(self.transition("configure", indicator)),
            Err(err) => Ok(self.fail("configure", err)),
        }
    }

    /// Set up runtime-mutable state, possibly with different parameters
    /// than configure time. Legal only from `Configured`. Clears the
    /// status string on success.
    ///
    /// # Errors
    /// [`LifecycleError::InvalidTransition`] when called out of order.
    pub fn initialise(
        &mut self,
        params: &TaskParameters,
    ) -> Result<TaskIndicator, LifecycleError> {
        self.expect("initialise", self.status == TaskIndicator::Configured)?;

        match self.body.initialise(params) {
            Ok(indicator) => {
                self.status_string.clear();
                Ok(self.transition("initialise", indicator))
            }
            Err(err) => Ok(self.fail("initialise", err)),
        }
    }

    /// One work cycle. Legal from `Initialised` or `Running`.
    ///
    /// For periodic tasks the scheduler calls this at roughly
    /// `task_period`; for aperiodic tasks exactly once (the call may block
    /// until the work is done). A `Failed` outcome records the body's
    /// reason in the status string.
    ///
    /// # Errors
    /// [`LifecycleError::InvalidTransition`] when called out of order.
    pub fn iterate(&mut self) -> Result<TaskIndicator, LifecycleError> {
        self.expect("iterate", self.status.accepts_iterate())?;

        let outcome = self.body.iterate();
        let indicator = outcome.indicator();
        if let Iteration::Failed(reason) = outcome {
            self.status_string = reason;
            tracing::warn!(
                task = %self.name,
                run = %self.run_id,
                reason = %self.status_string,
                "Task iteration failed"
            );
        }
        Ok(self.transition("iterate", indicator))
    }

    /// Release resources and bring the run to a quiescent state. Legal
    /// from `Initialised`, `Running`, `Completed` or `Failed` — including
    /// a run cancelled before it ever iterated. Always lands in
    /// `Terminated`.
    ///
    /// # Errors
    /// [`LifecycleError::InvalidTransition`] when called out of order.
    pub fn terminate(&mut self) -> Result<TaskIndicator, LifecycleError> {
        self.expect("terminate", self.status.accepts_terminate())?;

        self.body.terminate();
        Ok(self.transition("terminate", TaskIndicator::Terminated))
    }

    /// Clear the status string and bookkeeping without moving the
    /// lifecycle position. Harness utility; task bodies never call this.
    pub fn reset_status(&mut self) {
        self.status_string.clear();
        self.updated_at = Utc::now();
    }

    fn expect(&self, call: &'static str, legal: bool) -> Result<(), LifecycleError> {
        if legal {
            Ok(())
        } else {
            Err(LifecycleError::InvalidTransition {
                call,
                from: self.status,
            })
        }
    }

    fn transition(&mut self, call: &str, indicator: TaskIndicator) -> TaskIndicator {
        if indicator == TaskIndicator::Failed && self.status_string.is_empty() {
            // A failed run always explains itself
            self.status_string = format!("task failed during {call}");
        }
        self.status = indicator;
        self.updated_at = Utc::now();
        tracing::debug!(
            task = %self.name,
            run = %self.run_id,
            call,
            status = %indicator,
            "Task transition"
        );
        indicator
    }

    fn fail(&mut self, call: &str, err: InvalidParameter) -> TaskIndicator {
        self.status_string = err.to_string();
        tracing::warn!(
            task = %self.name,
            run = %self.run_id,
            call,
            reason = %self.status_string,
            "Task rejected its parameters"
        );
        self.transition(call, TaskIndicator::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::TaskParameters;
    use crate::task::definition::{
        Iteration, TaskBody, TaskDefinition, TaskDescriptor,
    };

    /// Periodic test task: completes after `cycles` iterations, rejects a
    /// non-positive cycle count at configure time.
    struct Countdown {
        descriptor: TaskDescriptor,
        cycles: i64,
    }

    impl Countdown {
        fn new(cycles: i64) -> Self {
            Self {
                descriptor: TaskDescriptor::new(
                    "Countdown",
                    "Completes after a fixed number of cycles",
                    true,
                    -1.0,
                ),
                cycles,
            }
        }
    }

    struct CountdownBody {
        remaining: i64,
        fail_at: Option<i64>,
    }

    impl TaskBody for CountdownBody {
        fn configure(
            &mut self,
            params: &TaskParameters,
        ) -> Result<TaskIndicator, InvalidParameter> {
            if let Some(cycles) = params.get::<i64>("cycles") {
                if cycles <= 0 {
                    return Err(InvalidParameter::new(format!(
                        "cycles must be positive, got {cycles}"
                    )));
                }
                self.remaining = cycles;
            }
            Ok(TaskIndicator::Configured)
        }

        fn iterate(&mut self) -> Iteration {
            if self.fail_at == Some(self.remaining) {
                return Iteration::failed("injected failure");
            }
            self.remaining -= 1;
            if self.remaining <= 0 {
                Iteration::Completed
            } else {
                Iteration::Running
            }
        }
    }

    impl TaskDefinition for Countdown {
        fn descriptor(&self) -> &TaskDescriptor {
            &self.descriptor
        }

        fn spawn_body(&self) -> Box<dyn TaskBody> {
            Box::new(CountdownBody {
                remaining: self.cycles,
                fail_at: None,
            })
        }
    }

    fn configured_run(definition: &Countdown) -> TaskRun {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        let mut run = TaskRun::spawn(definition, 1);
        let params = definition.default_parameters();
        run.configure(&params).unwrap();
        run.initialise(&params).unwrap();
        run
    }

    #[test]
    fn test_happy_lifecycle() {
        let definition = Countdown::new(2);
        let mut run = configured_run(&definition);

        assert_eq!(run.iterate().unwrap(), TaskIndicator::Running);
        assert_eq!(run.iterate().unwrap(), TaskIndicator::Completed);
        assert_eq!(run.terminate().unwrap(), TaskIndicator::Terminated);
        assert_eq!(run.status(), TaskIndicator::Terminated);
    }

    #[test]
    fn test_iterate_before_initialise_is_rejected() {
        let definition = Countdown::new(1);
        let mut run = TaskRun::spawn(&definition, 1);

        let err = run.iterate().unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidTransition { call: "iterate", from: TaskIndicator::Newborn }
        ));
        // The failed call left no mark on the run
        assert_eq!(run.status(), TaskIndicator::Newborn);
    }

    #[test]
    fn test_terminate_from_initialised() {
        // Cancellation before the first iterate
        let definition = Countdown::new(3);
        let mut run = configured_run(&definition);

        assert_eq!(run.status(), TaskIndicator::Initialised);
        assert_eq!(run.terminate().unwrap(), TaskIndicator::Terminated);
    }

    #[test]
    fn test_invalid_parameter_becomes_failed_status() {
        let definition = Countdown::new(1);
        let mut run = TaskRun::spawn(&definition, 1);

        let mut params = definition.default_parameters();
        params.set("cycles", -3i64);

        // Converted by the wrapper, not propagated
        let indicator = run.configure(&params).unwrap();
        assert_eq!(indicator, TaskIndicator::Failed);
        assert!(run.status_string().contains("cycles must be positive"));
        assert!(!run.status_string().is_empty());

        // A failed run must still accept terminate
        assert_eq!(run.terminate().unwrap(), TaskIndicator::Terminated);
    }

    #[test]
    fn test_iteration_failure_carries_reason() {
        let definition = Countdown::new(5);
        let mut run = TaskRun::spawn(&definition, 1);
        run.body = Box::new(CountdownBody {
            remaining: 5,
            fail_at: Some(4),
        });
        let params = definition.default_parameters();
        run.configure(&params).unwrap();
        run.initialise(&params).unwrap();

        assert_eq!(run.iterate().unwrap(), TaskIndicator::Running);
        assert_eq!(run.iterate().unwrap(), TaskIndicator::Failed);
        assert_eq!(run.status_string(), "injected failure");
        assert_eq!(run.terminate().unwrap(), TaskIndicator::Terminated);
    }

    #[test]
    fn test_task_period_defaults_to_one_second() {
        // A store without task_period still configures fine; the compiled
        // default (1.0) applies.
        let definition = Countdown::new(1);
        let mut run = TaskRun::spawn(&definition, 1);

        let mut params = TaskParameters::new();
        params.set("cycles", 1i64);
        assert_eq!(run.configure(&params).unwrap(), TaskIndicator::Configured);
        assert_eq!(run.period(), 1.0);
    }

    #[test]
    fn test_rename_and_timeout_from_parameters() {
        let definition = Countdown::new(1);
        let mut run = TaskRun::spawn(&definition, 7);

        let mut params = definition.default_parameters();
        params.set(TASK_RENAME, "Countdown_left");
        params.set(TASK_TIMEOUT, 12.5);
        run.configure(&params).unwrap();

        assert_eq!(run.name(), "Countdown_left");
        assert_eq!(run.timeout(), 12.5);
        assert_eq!(run.task_id(), 7);
    }

    #[test]
    fn test_spawned_runs_are_independent() {
        let definition = Countdown::new(1);
        let mut failing = TaskRun::spawn(&definition, 1);
        let fresh = TaskRun::spawn(&definition, 1);

        let mut params = definition.default_parameters();
        params.set("cycles", 0i64);
        assert_eq!(failing.configure(&params).unwrap(), TaskIndicator::Failed);

        // Driving one run to Failed leaves the other untouched
        assert_eq!(fresh.status(), TaskIndicator::Newborn);
        assert!(fresh.status_string().is_empty());
        assert_ne!(failing.run_id(), fresh.run_id());
    }

    #[test]
    fn test_status_report_reflects_last_transition() {
        let definition = Countdown::new(1);
        let mut run = configured_run(&definition);
        run.iterate().unwrap();

        let report = run.status_report();
        assert_eq!(report.status, TaskIndicator::Completed);
        assert_eq!(report.name, "Countdown");
        assert_eq!(report.run_id, run.run_id());
    }
}
