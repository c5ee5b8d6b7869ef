//! Results of a pipeline run
//!
//! Records are created fresh for every run and only live long enough to be
//! reported; nothing here is persisted.

use crate::core::{ExecutionStatus, FailureReason, StepStatus, TaskState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// What happened to one step
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub task: String,
    pub step: String,
    /// Command line, without escalation prefix
    pub command: String,
    pub elevated: bool,
    pub status: StepStatus,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl StepRecord {
    /// Captured stdout and stderr, joined for display
    pub fn combined_output(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            ("", "") => String::new(),
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

/// What happened to one task
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub name: String,
    pub state: TaskState,
    pub steps: Vec<StepRecord>,
    /// Why the task was skipped, if it was
    pub skip_reason: Option<String>,
}

impl TaskRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: TaskState::Pending,
            steps: Vec::new(),
            skip_reason: None,
        }
    }
}

/// The step that stopped the run
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub task: String,
    pub step: String,
    pub reason: FailureReason,
    pub stdout: String,
    pub stderr: String,
}

/// Runtime errors, derived from a finished run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("task '{task}' failed at step '{step}': {reason}")]
    StepFailed {
        task: String,
        step: String,
        reason: FailureReason,
    },

    #[error("task '{task}' was interrupted during step '{step}'")]
    Interrupted { task: String, step: String },
}

/// Aggregate result of running a target task and its dependencies
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub execution_id: Uuid,
    /// Task that was requested (as typed, possibly an alias)
    pub target: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Every task in the plan, in execution order
    pub tasks: Vec<TaskRecord>,
    pub failure: Option<FailureReport>,
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn task(&self, name: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Tasks that succeeded, in the order they ran
    pub fn completed_tasks(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| t.state == TaskState::Succeeded)
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Every recorded step across all tasks, in execution order
    pub fn steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.tasks.iter().flat_map(|t| t.steps.iter())
    }

    /// The error that stopped the run, if any
    pub fn error(&self) -> Option<PipelineError> {
        self.failure.as_ref().map(|failure| {
            if failure.reason.is_interrupt() {
                PipelineError::Interrupted {
                    task: failure.task.clone(),
                    step: failure.step.clone(),
                }
            } else {
                PipelineError::StepFailed {
                    task: failure.task.clone(),
                    step: failure.step.clone(),
                    reason: failure.reason.clone(),
                }
            }
        })
    }

    /// Process exit code for this result
    pub fn exit_code(&self) -> i32 {
        match self.status {
            ExecutionStatus::Completed => 0,
            ExecutionStatus::Cancelled => 130,
            _ => 1,
        }
    }
}
