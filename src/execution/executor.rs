//! Step executor - runs individual steps through a process runner

use crate::core::{FailureReason, Step, StepStatus};
use crate::execution::{Interrupt, Invocation, ProcessError, ProcessOutput, ProcessRunner, StepRecord};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// Executes a single step
pub struct StepExecutor<R> {
    runner: R,
    /// Directory step paths are resolved against
    base_dir: PathBuf,
}

impl<R: ProcessRunner> StepExecutor<R> {
    pub fn new(runner: R, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            base_dir: base_dir.into(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory the step's command runs in
    pub fn working_dir(&self, step: &Step) -> PathBuf {
        match &step.working_dir {
            Some(dir) => self.base_dir.join(dir),
            None => self.base_dir.clone(),
        }
    }

    /// Execute a step of `task` and record the outcome
    ///
    /// The step's failure policy is applied here: a failing best-effort step
    /// comes back as [`StepStatus::Tolerated`]. An interrupt always comes back
    /// as [`StepStatus::Failed`], whatever the policy.
    pub async fn execute(&self, task: &str, step: &Step, interrupt: &Interrupt) -> StepRecord {
        let started_at = Utc::now();
        let clock = Instant::now();
        let record = |status: StepStatus, output: ProcessOutput| StepRecord {
            task: task.to_string(),
            step: step.name.clone(),
            command: step.command_line(),
            elevated: step.is_elevated(),
            status,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
        };

        if interrupt.is_triggered() {
            let status = StepStatus::Failed {
                reason: FailureReason::Interrupted,
            };
            return record(status, ProcessOutput::default());
        }

        if let Some(marker) = &step.skip_if_exists {
            let path = self.base_dir.join(marker);
            if path.exists() {
                info!(
                    "Skipping {}/{}: {} already exists",
                    task,
                    step.name,
                    path.display()
                );
                let status = StepStatus::Skipped {
                    existing: path.display().to_string(),
                };
                return record(status, ProcessOutput::default());
            }
        }

        if step.is_elevated() {
            warn!(
                "{}/{} runs with elevated privileges: {}",
                task,
                step.name,
                step.command_line()
            );
        } else {
            info!("Executing {}/{}: {}", task, step.name, step.command_line());
        }

        let invocation = Invocation {
            program: step.program.clone(),
            args: step.args.clone(),
            working_dir: self.working_dir(step),
            elevated: step.is_elevated(),
            timeout: step.timeout,
        };

        let (reason, output) = match self.runner.run(&invocation, interrupt).await {
            Ok(output) if output.success() => {
                info!("{}/{} completed successfully", task, step.name);
                return record(StepStatus::Succeeded, output);
            }
            Ok(output) => (
                FailureReason::ExitStatus {
                    code: output.exit_code,
                },
                output,
            ),
            Err(ProcessError::Interrupted) => {
                warn!("{}/{} interrupted", task, step.name);
                let status = StepStatus::Failed {
                    reason: FailureReason::Interrupted,
                };
                return record(status, ProcessOutput::default());
            }
            Err(ProcessError::Timeout(limit)) => (
                FailureReason::Timeout {
                    secs: limit.as_secs(),
                },
                ProcessOutput::default(),
            ),
            Err(err @ ProcessError::Spawn { .. }) => (
                FailureReason::Spawn {
                    message: err.to_string(),
                },
                ProcessOutput::default(),
            ),
        };

        if step.is_best_effort() {
            warn!(
                "{}/{} failed ({}), continuing because it is best-effort",
                task, step.name, reason
            );
            record(StepStatus::Tolerated { reason }, output)
        } else {
            error!("{}/{} failed: {}", task, step.name, reason);
            record(StepStatus::Failed { reason }, output)
        }
    }
}
