//! Test utilities for provisioning scenarios

use async_trait::async_trait;
use provision::core::config::PipelineConfig;
use provision::core::{ExecutionStatus, StepStatus, TaskState};
use provision::execution::{
    Interrupt, Invocation, PipelineResult, PipelineRunner, ProcessError, ProcessOutput,
    ProcessRunner,
};
use std::sync::{Arc, Mutex};

/// Runner that fails scripted command lines and records everything it is asked to run
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    failures: Arc<Vec<(String, i32)>>,
    seen: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation whose command line equals `command` exit with `code`
    pub fn failing(mut self, command: &str, code: i32) -> Self {
        let mut failures = (*self.failures).clone();
        failures.push((command.to_string(), code));
        self.failures = Arc::new(failures);
        self
    }

    /// Invocations in the order they ran
    pub fn seen(&self) -> Vec<Invocation> {
        self.seen.lock().unwrap().clone()
    }

    /// Command lines in the order they ran
    pub fn commands(&self) -> Vec<String> {
        self.seen().iter().map(Invocation::command_line).collect()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        interrupt: &Interrupt,
    ) -> Result<ProcessOutput, ProcessError> {
        if interrupt.is_triggered() {
            return Err(ProcessError::Interrupted);
        }
        self.seen.lock().unwrap().push(invocation.clone());

        let command = invocation.command_line();
        let code = self
            .failures
            .iter()
            .find(|(failing, _)| *failing == command)
            .map(|(_, code)| *code)
            .unwrap_or(0);

        Ok(ProcessOutput {
            exit_code: Some(code),
            stdout: format!("ran {}", command),
            stderr: if code == 0 {
                String::new()
            } else {
                format!("{} exited with {}", command, code)
            },
        })
    }
}

/// Run `target` from the built-in pipeline against `runner`
pub async fn run_builtin(target: &str, runner: ScriptedRunner) -> PipelineResult {
    run_yaml(provision::core::config::BUILTIN_PIPELINE, target, runner).await
}

/// Run `target` from a YAML definition against `runner`
pub async fn run_yaml(yaml: &str, target: &str, runner: ScriptedRunner) -> PipelineResult {
    let config = PipelineConfig::from_yaml(yaml).unwrap();
    let graph = config.to_graph(&[]).unwrap();
    PipelineRunner::new(graph, runner, "/work")
        .run(target)
        .await
        .unwrap()
}

pub fn assert_pipeline_completed(result: &PipelineResult) {
    assert_eq!(
        result.status,
        ExecutionStatus::Completed,
        "expected run to complete, failure: {:?}",
        result.failure
    );
    assert_eq!(result.exit_code(), 0);
}

pub fn assert_pipeline_failed(result: &PipelineResult) {
    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.exit_code(), 1);
}

/// Assert the run stopped at `task`/`step`
pub fn assert_failed_at(result: &PipelineResult, task: &str, step: &str) {
    let failure = result.failure.as_ref().expect("run should have failed");
    assert_eq!(failure.task, task, "failing task");
    assert_eq!(failure.step, step, "failing step");

    let record = result.task(task).unwrap();
    assert_eq!(record.state, TaskState::Failed);
    let last = record.steps.last().unwrap();
    assert_eq!(last.step, step);
    assert!(matches!(last.status, StepStatus::Failed { .. }));
}

/// Assert the tasks of the plan, in execution order
pub fn assert_task_order(result: &PipelineResult, expected: &[&str]) {
    let actual: Vec<&str> = result.tasks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(actual, expected, "task order mismatch");
}

/// Names of the steps that actually ran for `task`
pub fn steps_run(result: &PipelineResult, task: &str) -> Vec<String> {
    result
        .task(task)
        .map(|t| t.steps.iter().map(|s| s.step.clone()).collect())
        .unwrap_or_default()
}
