//! Errors raised while defining or resolving the task graph

use thiserror::Error;

/// Configuration-time errors. None of these are recoverable: they mean the
/// pipeline definition is broken, and nothing may be spawned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("unknown task '{0}'")]
    UnknownTask(String),
}
