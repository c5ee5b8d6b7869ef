//! Task domain model

use crate::core::Step;

/// A named unit of provisioning work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Unique task name
    pub name: String,

    /// Alternative names the task can be invoked by
    pub aliases: Vec<String>,

    /// Human-readable description
    pub description: Option<String>,

    /// Tasks that must run to completion first, in this order
    pub depends_on: Vec<String>,

    /// Steps, in execution order
    pub steps: Vec<Step>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            depends_on: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn depends_on(mut self, task: impl Into<String>) -> Self {
        self.depends_on.push(task.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Names this task answers to: its own name followed by its aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}
