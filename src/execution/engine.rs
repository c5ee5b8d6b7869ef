//! Pipeline runner - resolves a task's plan and runs it step by step

use crate::{
    core::{
        ExecutionStatus, FailureReason, RegistryError, StepStatus, Task, TaskGraph, TaskState,
    },
    execution::{
        FailureReport, Interrupt, PipelineResult, ProcessRunner, StepExecutor, TaskRecord,
    },
};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        target: String,
        plan: Vec<String>,
        total_steps: usize,
    },
    TaskStarted {
        task: String,
    },
    TaskSkipped {
        task: String,
        reason: String,
    },
    StepStarted {
        task: String,
        step: String,
        command: String,
        elevated: bool,
    },
    StepOutput {
        task: String,
        step: String,
        output: String,
    },
    /// Step finished without stopping its task (succeeded, skipped or tolerated)
    StepCompleted {
        task: String,
        step: String,
        status: StepStatus,
        elapsed_ms: u64,
    },
    StepFailed {
        task: String,
        step: String,
        reason: FailureReason,
    },
    TaskFinished {
        task: String,
        state: TaskState,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Runs tasks of a validated graph, strictly one step at a time
pub struct PipelineRunner<R> {
    graph: TaskGraph,
    executor: StepExecutor<R>,
    interrupt: Interrupt,
    event_handlers: Vec<EventHandler>,
}

impl<R: ProcessRunner> PipelineRunner<R> {
    pub fn new(graph: TaskGraph, runner: R, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            graph,
            executor: StepExecutor::new(runner, base_dir),
            interrupt: Interrupt::new(),
            event_handlers: Vec::new(),
        }
    }

    /// Use an interrupt shared with the caller (e.g. a Ctrl-C handler)
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn executor(&self) -> &StepExecutor<R> {
        &self.executor
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Tasks that running `target` executes, in order
    pub fn plan(&self, target: &str) -> Result<Vec<&Task>, RegistryError> {
        Ok(self
            .graph
            .resolve_order(target)?
            .filter_map(|name| self.graph.task(name))
            .collect())
    }

    /// Run `target` and everything it depends on
    ///
    /// Only an unknown target is an `Err`; step failures and interrupts are
    /// reported through the returned [`PipelineResult`].
    pub async fn run(&self, target: &str) -> Result<PipelineResult, RegistryError> {
        let plan = self.plan(target)?;
        let execution_id = Uuid::new_v4();
        let started_at = Utc::now();
        let names: Vec<String> = plan.iter().map(|t| t.name.clone()).collect();

        info!(
            "Starting '{}' ({}): {}",
            target,
            execution_id,
            names.join(" -> ")
        );
        self.emit(ExecutionEvent::PipelineStarted {
            execution_id,
            target: target.to_string(),
            plan: names,
            total_steps: plan.iter().map(|t| t.steps.len()).sum(),
        });

        let mut records: Vec<TaskRecord> = plan.iter().map(|t| TaskRecord::new(&t.name)).collect();
        let mut failure: Option<FailureReport> = None;

        for (task, record) in plan.iter().zip(records.iter_mut()) {
            if let Some(failed) = &failure {
                let reason = self.skip_reason(task, failed);
                info!("Skipping task '{}': {}", task.name, reason);
                record.state = TaskState::Skipped;
                record.skip_reason = Some(reason.clone());
                self.emit(ExecutionEvent::TaskSkipped {
                    task: task.name.clone(),
                    reason,
                });
                continue;
            }

            record.state = TaskState::Running;
            info!("Running task '{}'", task.name);
            self.emit(ExecutionEvent::TaskStarted {
                task: task.name.clone(),
            });

            for step in &task.steps {
                self.emit(ExecutionEvent::StepStarted {
                    task: task.name.clone(),
                    step: step.name.clone(),
                    command: step.command_line(),
                    elevated: step.is_elevated(),
                });

                let step_record = self.executor.execute(&task.name, step, &self.interrupt).await;

                let output = step_record.combined_output();
                if !output.is_empty() {
                    self.emit(ExecutionEvent::StepOutput {
                        task: task.name.clone(),
                        step: step.name.clone(),
                        output,
                    });
                }

                match &step_record.status {
                    StepStatus::Failed { reason } => {
                        self.emit(ExecutionEvent::StepFailed {
                            task: task.name.clone(),
                            step: step.name.clone(),
                            reason: reason.clone(),
                        });
                        failure = Some(FailureReport {
                            task: task.name.clone(),
                            step: step.name.clone(),
                            reason: reason.clone(),
                            stdout: step_record.stdout.clone(),
                            stderr: step_record.stderr.clone(),
                        });
                    }
                    status => {
                        self.emit(ExecutionEvent::StepCompleted {
                            task: task.name.clone(),
                            step: step.name.clone(),
                            status: status.clone(),
                            elapsed_ms: step_record.elapsed_ms,
                        });
                    }
                }

                record.steps.push(step_record);
                if failure.is_some() {
                    break;
                }
            }

            record.state = if failure.is_some() {
                TaskState::Failed
            } else {
                TaskState::Succeeded
            };
            self.emit(ExecutionEvent::TaskFinished {
                task: task.name.clone(),
                state: record.state,
            });
        }

        let status = match &failure {
            None => ExecutionStatus::Completed,
            Some(f) if f.reason.is_interrupt() => ExecutionStatus::Cancelled,
            Some(_) => ExecutionStatus::Failed,
        };

        match &failure {
            None => info!("'{}' finished successfully", target),
            Some(f) if f.reason.is_interrupt() => {
                warn!("'{}' interrupted in {}/{}", target, f.task, f.step)
            }
            Some(f) => error!("'{}' failed in {}/{}: {}", target, f.task, f.step, f.reason),
        }
        self.emit(ExecutionEvent::PipelineCompleted {
            execution_id,
            status,
        });

        Ok(PipelineResult {
            execution_id,
            target: target.to_string(),
            status,
            started_at,
            completed_at: Utc::now(),
            tasks: records,
            failure,
        })
    }

    fn skip_reason(&self, task: &Task, failed: &FailureReport) -> String {
        if failed.reason.is_interrupt() {
            format!("run interrupted in '{}'", failed.task)
        } else if self.graph.depends_on(&task.name, &failed.task) {
            format!("dependency '{}' failed", failed.task)
        } else {
            format!("run stopped after '{}' failed", failed.task)
        }
    }
}
