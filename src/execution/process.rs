//! Process runners - spawn step commands as subprocesses

use crate::execution::Interrupt;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// A fully resolved command, ready to be spawned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Whether the command must run with elevated privileges
    pub elevated: bool,
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Command line without escalation prefix
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Errors from spawning or waiting on a process
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start '{program}' in {}: {source}", .working_dir.display())]
    Spawn {
        program: String,
        working_dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("interrupted")]
    Interrupted,
}

/// Trait for process execution - allows steps to be run for real, simulated,
/// or scripted in tests
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation to completion, or until `interrupt` fires
    async fn run(
        &self,
        invocation: &Invocation,
        interrupt: &Interrupt,
    ) -> Result<ProcessOutput, ProcessError>;
}

/// Runs invocations as real child processes
#[derive(Debug, Clone)]
pub struct SubprocessRunner {
    /// Prefix for elevated commands, e.g. `["sudo"]`; empty runs them as-is
    escalation: Vec<String>,
}

impl SubprocessRunner {
    pub fn new(escalation: Vec<String>) -> Self {
        Self { escalation }
    }

    pub fn escalation(&self) -> &[String] {
        &self.escalation
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut command = match self.escalation.split_first() {
            Some((prefix, prefix_args)) if invocation.elevated => {
                let mut command = Command::new(prefix);
                command.args(prefix_args).arg(&invocation.program);
                command
            }
            _ => Command::new(&invocation.program),
        };

        command
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new(vec!["sudo".to_string()])
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        interrupt: &Interrupt,
    ) -> Result<ProcessOutput, ProcessError> {
        if interrupt.is_triggered() {
            return Err(ProcessError::Interrupted);
        }

        debug!(
            "Spawning '{}' in {}",
            invocation.command_line(),
            invocation.working_dir.display()
        );

        let mut command = self.command(invocation);
        let finished = async {
            let output = command.output();
            let result = match invocation.timeout {
                Some(limit) => match timeout(limit, output).await {
                    Ok(result) => result,
                    Err(_) => return Err(ProcessError::Timeout(limit)),
                },
                None => output.await,
            };
            result.map_err(|source| ProcessError::Spawn {
                program: invocation.program.clone(),
                working_dir: invocation.working_dir.clone(),
                source,
            })
        };

        // Dropping the losing future kills the child (kill_on_drop)
        let output = tokio::select! {
            biased;
            _ = interrupt.triggered() => {
                warn!("Interrupted while running '{}'", invocation.command_line());
                return Err(ProcessError::Interrupted);
            }
            result = finished => result?,
        };

        // Ctrl-C reaches the whole foreground process group, so the child can
        // die from it before the interrupt flag is observed
        if interrupted_exit(output.status, interrupt) {
            warn!(
                "'{}' stopped by an interrupt ({})",
                invocation.command_line(),
                output.status
            );
            return Err(ProcessError::Interrupted);
        }

        let output = ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            "'{}' exited with {:?} ({} bytes of output)",
            invocation.program,
            output.exit_code,
            output.stdout.len() + output.stderr.len()
        );
        Ok(output)
    }
}

/// Whether an unsuccessful exit was caused by a user interrupt
fn interrupted_exit(status: ExitStatus, interrupt: &Interrupt) -> bool {
    if status.success() {
        return false;
    }
    interrupt.is_triggered() || terminated_by_sigint(status)
}

#[cfg(unix)]
fn terminated_by_sigint(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    const SIGINT: i32 = 2;
    status.signal() == Some(SIGINT)
}

#[cfg(not(unix))]
fn terminated_by_sigint(_status: ExitStatus) -> bool {
    false
}

/// Pretends every invocation succeeded without spawning anything
#[derive(Debug, Clone, Default)]
pub struct DryRunRunner;

#[async_trait]
impl ProcessRunner for DryRunRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        interrupt: &Interrupt,
    ) -> Result<ProcessOutput, ProcessError> {
        if interrupt.is_triggered() {
            return Err(ProcessError::Interrupted);
        }
        debug!("Dry run: {}", invocation.command_line());
        Ok(ProcessOutput {
            exit_code: Some(0),
            ..ProcessOutput::default()
        })
    }
}
