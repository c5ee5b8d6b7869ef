//! Task registry and the validated task graph
//!
//! Tasks are registered one by one into a [`TaskRegistry`]. Dependencies may
//! reference tasks registered later; they are only checked by
//! [`TaskRegistry::validate`], which consumes the registry and yields an
//! immutable [`TaskGraph`]. Only a validated graph can be resolved or run.

use crate::core::{RegistryError, Task};
use std::collections::{HashMap, HashSet};

/// Mutable collection of task definitions, before validation
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    /// Task name or alias -> position in `tasks`
    index: HashMap<String, usize>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Fails if its name or any alias is already taken.
    pub fn register(&mut self, task: Task) -> Result<(), RegistryError> {
        let mut own = HashSet::new();
        for name in task.names() {
            if self.index.contains_key(name) || !own.insert(name) {
                return Err(RegistryError::DuplicateTask(name.to_string()));
            }
        }

        let position = self.tasks.len();
        for name in task.names() {
            self.index.insert(name.to_string(), position);
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Check the whole graph: every dependency must resolve and there must be
    /// no cycle.
    pub fn validate(self) -> Result<TaskGraph, RegistryError> {
        for task in &self.tasks {
            for dep in &task.depends_on {
                if !self.index.contains_key(dep) {
                    return Err(RegistryError::UnknownDependency {
                        task: task.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        let mut marks = vec![Mark::Unvisited; self.tasks.len()];
        let mut path = Vec::new();
        for start in 0..self.tasks.len() {
            if marks[start] == Mark::Unvisited {
                self.visit(start, &mut marks, &mut path)?;
            }
        }

        Ok(TaskGraph {
            tasks: self.tasks,
            index: self.index,
        })
    }

    fn visit(
        &self,
        position: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
    ) -> Result<(), RegistryError> {
        marks[position] = Mark::InProgress;
        path.push(position);

        for dep in &self.tasks[position].depends_on {
            let Some(&next) = self.index.get(dep) else {
                continue;
            };
            match marks[next] {
                Mark::InProgress => {
                    let start = path.iter().position(|&p| p == next).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..]
                        .iter()
                        .map(|&p| self.tasks[p].name.clone())
                        .collect();
                    cycle.push(self.tasks[next].name.clone());
                    return Err(RegistryError::CyclicDependency { cycle });
                }
                Mark::Unvisited => self.visit(next, marks, path)?,
                Mark::Done => {}
            }
        }

        path.pop();
        marks[position] = Mark::Done;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validated, immutable set of tasks
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskGraph {
    /// Look up a task by name or alias
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&position| &self.tasks[position])
    }

    /// All tasks, in registration order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Canonical task names in execution order for `name`: every transitive
    /// dependency exactly once, before anything that needs it, `name` last.
    pub fn resolve_order(&self, name: &str) -> Result<ResolveOrder<'_>, RegistryError> {
        let root = self
            .task(name)
            .ok_or_else(|| RegistryError::UnknownTask(name.to_string()))?;
        Ok(ResolveOrder {
            graph: self,
            stack: vec![(root, 0)],
            emitted: HashSet::new(),
        })
    }

    /// Whether `task` needs `dependency`, directly or transitively
    pub fn depends_on(&self, task: &str, dependency: &str) -> bool {
        let (Some(task), Some(dependency)) = (self.task(task), self.task(dependency)) else {
            return false;
        };
        if task.name == dependency.name {
            return false;
        }
        self.resolve_order(&task.name)
            .map(|mut order| order.any(|name| name == dependency.name))
            .unwrap_or(false)
    }
}

/// Lazy depth-first walk yielding tasks after all of their dependencies
#[derive(Debug)]
pub struct ResolveOrder<'a> {
    graph: &'a TaskGraph,
    /// Tasks being expanded, with the index of the next dependency to visit
    stack: Vec<(&'a Task, usize)>,
    emitted: HashSet<&'a str>,
}

impl<'a> Iterator for ResolveOrder<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let (task, next_dep) = {
                let top = self.stack.last_mut()?;
                let current = (top.0, top.1);
                top.1 += 1;
                current
            };

            match task.depends_on.get(next_dep) {
                Some(dep) => {
                    if let Some(dep_task) = self.graph.task(dep) {
                        if !self.emitted.contains(dep_task.name.as_str()) {
                            self.stack.push((dep_task, 0));
                        }
                    }
                }
                None => {
                    self.stack.pop();
                    if self.emitted.insert(task.name.as_str()) {
                        return Some(task.name.as_str());
                    }
                }
            }
        }
    }
}
