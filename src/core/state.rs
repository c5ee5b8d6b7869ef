//! Execution state models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run has not started
    Pending,
    /// Run is in progress
    Running,
    /// Target task and all its dependencies succeeded
    Completed,
    /// A step failed
    Failed,
    /// The run was interrupted by the user
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Completed)
    }
}

/// State of a single task within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Waiting for earlier tasks in the plan
    Pending,
    /// Steps are being executed
    Running,
    /// Every non-best-effort step succeeded
    Succeeded,
    /// A step failed or was interrupted
    Failed,
    /// Not run because an earlier task in the plan failed
    Skipped,
}

impl TaskState {
    /// Check if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Succeeded | TaskState::Failed | TaskState::Skipped
        )
    }
}

/// Why a step did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The process exited unsuccessfully (`None` when killed by a signal)
    ExitStatus { code: Option<i32> },
    /// The process could not be started
    Spawn { message: String },
    /// The process exceeded its timeout
    Timeout { secs: u64 },
    /// The user interrupted the run
    Interrupted,
}

impl FailureReason {
    pub fn is_interrupt(&self) -> bool {
        matches!(self, FailureReason::Interrupted)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ExitStatus { code: Some(code) } => write!(f, "exit code {}", code),
            FailureReason::ExitStatus { code: None } => write!(f, "terminated by signal"),
            FailureReason::Spawn { message } => write!(f, "could not start: {}", message),
            FailureReason::Timeout { secs } => write!(f, "timed out after {}s", secs),
            FailureReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// Process exited with status 0
    Succeeded,
    /// Not spawned because its `skip_if_exists` path is present
    Skipped { existing: String },
    /// Best-effort step failed; the task carries on
    Tolerated { reason: FailureReason },
    /// The step failed and aborts its task
    Failed { reason: FailureReason },
}

impl StepStatus {
    /// Whether the enclosing task may continue after this step
    pub fn allows_continue(&self) -> bool {
        !matches!(self, StepStatus::Failed { .. })
    }
}
