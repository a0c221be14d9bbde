//! Runtime-loaded task modules.
//!
//! A loadable module is a shared library exporting one well-known factory
//! symbol (see [`declare_task!`](crate::declare_task)). [`ModuleTask`]
//! opens the library, resolves the factory, invokes it with the
//! environment capability, and then itself implements [`TaskDefinition`]
//! by delegation — so a dynamically loaded task is indistinguishable from
//! a built-in one to every other component.
//!
//! # Resource lifetime
//! The wrapped definition's code lives inside the module's memory. The
//! loader owns both exclusively and releases the definition strictly
//! before the library handle; releasing the handle first and then running
//! any task code would be undefined behavior. On every load failure the
//! partially acquired handle is closed before the error is returned.

use std::path::{Path, PathBuf};

use libloading::Library;
use thiserror::Error;

use crate::params::TaskParameters;
use crate::schema::ConfigDescription;
use crate::task::{EnvironmentRef, TaskBody, TaskDefinition, TaskDescriptor};

/// Name of the factory symbol every loadable task module exports.
pub const TASK_FACTORY_SYMBOL: &[u8] = b"task_factory";

/// Signature of the exported factory: takes the environment capability,
/// returns a constructed definition or `None` when the environment is not
/// the concrete type the task expects.
///
/// Host and module must be built with the same compiler and crate version;
/// the signature is `Rust`-ABI by design since modules are companion
/// artifacts of the host, not foreign code.
pub type TaskFactoryFn = fn(EnvironmentRef) -> Option<Box<dyn TaskDefinition>>;

/// Failures while loading a task module. The loader is never left
/// half-constructed: whichever step fails, no handle stays open.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot load task module '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("task module '{}' does not export 'task_factory': {source}", .path.display())]
    MissingFactory {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("factory in task module '{}' returned no task", .path.display())]
    EmptyFactory { path: PathBuf },
}

/// A task definition loaded from a shared module at runtime.
pub struct ModuleTask {
    // Field order is load-bearing: fields drop in declaration order, so
    // the definition (whose code lives in `library`) is released before
    // the handle.
    definition: Box<dyn TaskDefinition>,
    #[allow(dead_code)]
    library: Library,
    path: PathBuf,
}

impl std::fmt::Debug for ModuleTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleTask")
            .field("task", &self.definition.descriptor().name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ModuleTask {
    /// Open the module at `path`, resolve the factory, and wrap the task
    /// it builds for `environment`.
    ///
    /// # Errors
    /// [`LoadError`] naming the path when the module cannot be opened,
    /// does not export the factory symbol, or the factory returns no task.
    pub fn load(
        path: impl Into<PathBuf>,
        environment: EnvironmentRef,
    ) -> Result<Self, LoadError> {
        let path = path.into();

        // SAFETY: opening a library runs its initialisers, and the resolved
        // symbol is trusted to match `TaskFactoryFn`. Modules are companion
        // artifacts built against this crate via `declare_task!`.
        let library = unsafe { Library::new(&path) }.map_err(|source| LoadError::Open {
            path: path.clone(),
            source,
        })?;
        let produced = unsafe {
            let factory = library
                .get::<TaskFactoryFn>(TASK_FACTORY_SYMBOL)
                .map_err(|source| LoadError::MissingFactory {
                    path: path.clone(),
                    source,
                })?;
            factory(environment)
        };
        // An early return above drops `library`, closing the handle.
        let definition = produced.ok_or_else(|| LoadError::EmptyFactory { path: path.clone() })?;

        tracing::info!(
            task = %definition.descriptor().name,
            path = %path.display(),
            "Task module loaded"
        );
        Ok(Self {
            definition,
            library,
            path,
        })
    }

    /// The module file this definition was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskDefinition for ModuleTask {
    fn descriptor(&self) -> &TaskDescriptor {
        self.definition.descriptor()
    }

    fn schema(&self) -> &ConfigDescription {
        self.definition.schema()
    }

    fn default_parameters(&self) -> TaskParameters {
        self.definition.default_parameters()
    }

    fn spawn_body(&self) -> Box<dyn TaskBody> {
        self.definition.spawn_body()
    }
}

/// Export the factory entry point from a loadable task module.
///
/// The expression must be a `fn(EnvironmentRef) -> Option<Box<dyn
/// TaskDefinition>>`; returning `None` signals that the task could not be
/// constructed (typically an environment of the wrong concrete type).
///
/// ```ignore
/// taskmill::declare_task!(|environment| {
///     GoToTask::with_environment(environment).map(|task| Box::new(task) as _)
/// });
/// ```
#[macro_export]
macro_rules! declare_task {
    ($factory:expr) => {
        #[no_mangle]
        pub fn task_factory(
            environment: $crate::EnvironmentRef,
        ) -> Option<Box<dyn $crate::TaskDefinition>> {
            let factory: fn(
                $crate::EnvironmentRef,
            ) -> Option<Box<dyn $crate::TaskDefinition>> = $factory;
            factory(environment)
        }
    };
}
