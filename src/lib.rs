//! # taskmill
//!
//! Pluggable task execution framework: independent units of work with a
//! uniform lifecycle, loadable statically or from runtime-loaded modules,
//! configured through a typed-but-dynamic parameter store.
//!
//! This crate provides:
//! - The task lifecycle state machine and the wrapper that enforces it
//! - The prototype/instance split letting one definition back many runs
//! - Dynamic loading of task implementations from shared modules
//! - Schema bindings between typed config structs and the parameter store
//!
//! ## Architecture
//!
//! ```text
//!      ┌──────────────────┐  spawn   ┌──────────────────┐
//!      │  TaskDefinition  │ ───────► │     TaskRun      │
//!      │ (immutable       │  (per    │ (status, config, │
//!      │  template)       │   run)   │  body, run id)   │
//!      └────────┬─────────┘          └────────┬─────────┘
//!               │ built-in or                 │ configure → initialise
//!      ┌────────┴─────────┐                   │ → iterate* → terminate
//!      │    ModuleTask    │                   ▼
//!      │ (loaded from a   │          ┌──────────────────┐
//!      │  shared module)  │          │  TaskIndicator   │
//!      └──────────────────┘          └──────────────────┘
//! ```
//!
//! ## Task Flow
//! 1. Register definitions (built-in, or via [`ModuleTask::load`])
//! 2. Spawn a fresh run per execution with [`TaskRegistry::spawn`]
//! 3. Feed it parameters merged from defaults, storage, and overrides
//! 4. Drive configure → initialise → iterate (repeatedly if periodic) →
//!    terminate, reading status after every step
//!
//! ## Modules
//! - `params`: the generic typed parameter store
//! - `task`: definitions, runs, the lifecycle wrapper, published views
//! - `schema`: bindings between typed config structs and the store
//! - `registry`: catalog of known definitions, parameter sources
//! - `dynamic`: loading task modules at runtime
//! - `status`: the status indicator enumeration

pub mod dynamic;
pub mod params;
pub mod registry;
pub mod schema;
pub mod status;
pub mod task;

pub use dynamic::{LoadError, ModuleTask, TaskFactoryFn, TASK_FACTORY_SYMBOL};
pub use params::{ParamKind, ParamValue, TaskParameters};
pub use registry::{CompiledDefaults, ParameterSource, RegistryError, TaskRegistry};
pub use schema::{ConfigBinding, ConfigDescription, ParamSpec, SchemaError};
pub use status::TaskIndicator;
pub use task::{
    downcast_environment, EnvironmentRef, InvalidParameter, Iteration, LifecycleError, RunId,
    TaskBody, TaskDefinition, TaskDescription, TaskDescriptor, TaskEnvironment, TaskRun,
    TaskStatusReport,
};
