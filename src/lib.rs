//! provision - runs the budou / MeCab provisioning tasks in dependency order

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use core::config::PipelineConfig;
pub use core::{ExecutionStatus, FailureReason, RegistryError, Step, Task, TaskGraph, TaskRegistry};
pub use execution::{ExecutionEvent, Interrupt, PipelineResult, PipelineRunner, ProcessRunner};
