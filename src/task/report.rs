//! Read-only task views for publication.
//!
//! Both views are derivable at any time without mutating the task; the
//! transport that carries them to a remote caller is out of scope here,
//! hence plain serde types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::TaskParameters;
use crate::schema::ConfigDescription;
use crate::status::TaskIndicator;
use crate::task::definition::TaskDefinition;
use crate::task::run::RunId;

/// Snapshot of one run's current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub task_id: u32,
    pub run_id: RunId,
    pub name: String,
    pub status: TaskIndicator,
    /// Free-form diagnostic text; non-empty whenever status is `Failed`.
    pub status_string: String,
    /// When the last lifecycle transition was recorded.
    pub updated_at: DateTime<Utc>,
}

/// Static description of a task definition: everything a remote caller
/// needs to display the task and build a parameter store for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescription {
    pub task_id: u32,
    pub name: String,
    pub help: String,
    pub periodic: bool,
    pub default_timeout: f64,
    pub default_parameters: TaskParameters,
    pub schema: ConfigDescription,
}

impl TaskDescription {
    /// Describe a definition under the task id it was registered with.
    pub fn of(definition: &dyn TaskDefinition, task_id: u32) -> Self {
        let descriptor = definition.descriptor();
        Self {
            task_id,
            name: descriptor.name.clone(),
            help: descriptor.help.clone(),
            periodic: descriptor.periodic,
            default_timeout: descriptor.default_timeout,
            default_parameters: definition.default_parameters(),
            schema: definition.schema().clone(),
        }
    }
}
