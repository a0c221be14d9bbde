//! Task contract: definitions, runs, and their published views.
//!
//! The split follows the prototype/instance duality: a [`TaskDefinition`]
//! is the immutable template, a [`TaskRun`] is one spawned, independently
//! mutable execution of it. All lifecycle calls go through the run, which
//! enforces the state machine and owns the status.

mod definition;
mod report;
mod run;

pub use definition::{
    downcast_environment, EnvironmentRef, InvalidParameter, Iteration, TaskBody, TaskDefinition,
    TaskDescriptor, TaskEnvironment,
};
pub use report::{TaskDescription, TaskStatusReport};
pub use run::{LifecycleError, RunId, TaskRun};
