//! Catalog of known task definitions.
//!
//! The scheduler registers every definition it knows — built-in or loaded
//! from a module — under its name, gets back a stable numeric task id, and
//! spawns runs by name. The registry also hosts the pluggable
//! [`ParameterSource`] that answers "parameters from external storage,
//! else defaults" when a run is being configured.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::params::TaskParameters;
use crate::task::{TaskDefinition, TaskDescription, TaskRun};

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("no task registered under name '{0}'")]
    UnknownTask(String),

    #[error("a task named '{0}' is already registered")]
    DuplicateName(String),
}

/// Name-keyed registry assigning definition-level task ids.
///
/// # Invariants
/// - Task ids are assigned in registration order and never reused.
/// - One definition per name.
pub struct TaskRegistry {
    definitions: Vec<Arc<dyn TaskDefinition>>,
    by_name: HashMap<String, u32>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a definition under its descriptor name.
    ///
    /// Returns the assigned task id, carried by every run spawned from
    /// this definition.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateName`] if the name is taken.
    pub fn register(&mut self, definition: Arc<dyn TaskDefinition>) -> Result<u32, RegistryError> {
        let name = definition.descriptor().name.clone();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        let task_id = self.definitions.len() as u32;
        tracing::debug!(task = %name, task_id, "Task registered");
        self.by_name.insert(name, task_id);
        self.definitions.push(definition);
        Ok(task_id)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskDefinition>> {
        self.task_id(name)
            .map(|id| self.definitions[id as usize].clone())
    }

    pub fn task_id(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    /// Describe every registered definition, sorted by name.
    pub fn list(&self) -> Vec<TaskDescription> {
        let mut list: Vec<_> = self
            .by_name
            .iter()
            .map(|(_, &id)| TaskDescription::of(self.definitions[id as usize].as_ref(), id))
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Spawn a fresh run of the named task, carrying its registered id.
    ///
    /// # Errors
    /// [`RegistryError::UnknownTask`] if nothing is registered under `name`.
    pub fn spawn(&self, name: &str) -> Result<TaskRun, RegistryError> {
        let task_id = self
            .task_id(name)
            .ok_or_else(|| RegistryError::UnknownTask(name.to_string()))?;
        Ok(TaskRun::spawn(
            self.definitions[task_id as usize].as_ref(),
            task_id,
        ))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Provider of persisted task parameters, falling back to compiled
/// defaults when nothing is stored for a task.
pub trait ParameterSource {
    fn parameters_for(&self, definition: &dyn TaskDefinition) -> TaskParameters;
}

/// The trivial source: always the definition's compiled defaults.
pub struct CompiledDefaults;

impl ParameterSource for CompiledDefaults {
    fn parameters_for(&self, definition: &dyn TaskDefinition) -> TaskParameters {
        definition.default_parameters()
    }
}

/// The effective store a run is configured with: compiled defaults,
/// overlaid with the source's persisted values, overlaid with the
/// caller's overrides — applied in that order.
pub fn effective_parameters(
    source: &dyn ParameterSource,
    definition: &dyn TaskDefinition,
    overrides: &TaskParameters,
) -> TaskParameters {
    let mut params = definition.default_parameters();
    params.merge(&source.parameters_for(definition));
    params.merge(overrides);
    params
}
