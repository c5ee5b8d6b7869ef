//! Step domain model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Privilege a step needs to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privilege {
    /// Run as the invoking user
    #[default]
    Normal,
    /// Run through the escalation prefix (e.g. `sudo`)
    Elevated,
}

/// What happens to the enclosing task when a step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the task and everything waiting on it
    #[default]
    Abort,
    /// Log the failure and carry on with the next step
    Continue,
}

/// A single external operation inside a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Step name, unique within its task
    pub name: String,

    /// Program to spawn
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Working directory, relative to the run's base directory
    pub working_dir: Option<PathBuf>,

    /// Required privilege
    pub privilege: Privilege,

    /// Failure policy
    pub on_failure: FailurePolicy,

    /// The step is skipped when this path (relative to the base directory) exists
    pub skip_if_exists: Option<PathBuf>,

    /// Optional timeout; `None` waits for the process indefinitely
    pub timeout: Option<Duration>,
}

impl Step {
    /// Create a normal, aborting step with no working directory override
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_dir: None,
            privilege: Privilege::Normal,
            on_failure: FailurePolicy::Abort,
            skip_if_exists: None,
            timeout: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn elevated(mut self) -> Self {
        self.privilege = Privilege::Elevated;
        self
    }

    pub fn best_effort(mut self) -> Self {
        self.on_failure = FailurePolicy::Continue;
        self
    }

    pub fn skip_if_exists(mut self, path: impl Into<PathBuf>) -> Self {
        self.skip_if_exists = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_elevated(&self) -> bool {
        self.privilege == Privilege::Elevated
    }

    pub fn is_best_effort(&self) -> bool {
        self.on_failure == FailurePolicy::Continue
    }

    /// Command line as it would be typed, without any escalation prefix
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_elevated() {
            write!(f, "[elevated] ")?;
        }
        write!(f, "{}", self.command_line())?;
        if let Some(dir) = &self.working_dir {
            write!(f, " (in {})", dir.display())?;
        }
        Ok(())
    }
}
