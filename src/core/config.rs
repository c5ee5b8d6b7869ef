//! Pipeline configuration from YAML

use crate::core::{FailurePolicy, Privilege, Step, Task, TaskGraph, TaskRegistry};
use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Definition of the budou / MeCab provisioning pipeline shipped with the binary
pub const BUILTIN_PIPELINE: &str = include_str!("../../pipelines/budou.yaml");

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Values substituted for `{{ name }}` placeholders
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Command prepended to elevated steps (defaults to `sudo`)
    #[serde(default)]
    pub escalation: Option<Vec<String>>,

    /// Timeout applied to steps that don't set their own (unbounded if unset)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,

    /// Task definitions
    pub tasks: Vec<TaskConfig>,
}

/// Task configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique task name
    pub name: String,

    /// Alternative names
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Tasks to run first, in order
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Steps, in order
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Step name, unique within its task
    pub name: String,

    /// Command to run
    pub run: CommandLine,

    /// Working directory relative to the base directory
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default)]
    pub privilege: Privilege,

    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// Skip the step when this path already exists
    #[serde(default)]
    pub skip_if_exists: Option<String>,

    /// Timeout for this step (overrides the pipeline default)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// A command given either as a single whitespace-separated line or as a list
/// of arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Line(String),
    Argv(Vec<String>),
}

impl CommandLine {
    pub fn argv(&self) -> Vec<String> {
        match self {
            CommandLine::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandLine::Argv(args) => args.clone(),
        }
    }

    /// Substitute placeholders. A line is rendered before it is split, so a
    /// value containing whitespace is rejected there; such values need the
    /// list form, whose entries are rendered one by one and never split.
    pub fn render(&self, vars: &HashMap<String, String>) -> Result<Vec<String>> {
        match self {
            CommandLine::Line(line) => {
                for caps in placeholder().captures_iter(line) {
                    let name = &caps[1];
                    if let Some(value) = vars.get(name) {
                        if value.chars().any(char::is_whitespace) {
                            bail!(
                                "variable '{}' contains whitespace ({:?}); use the list form of `run` to pass it as one argument",
                                name,
                                value
                            );
                        }
                    }
                }
                Ok(CommandLine::Line(render(line, vars)?).argv())
            }
            CommandLine::Argv(args) => args.iter().map(|arg| render(arg, vars)).collect(),
        }
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// The pipeline compiled into the binary
    pub fn builtin() -> Result<Self> {
        let config = Self::from_yaml(BUILTIN_PIPELINE).context("Built-in pipeline is invalid")?;
        config
            .to_graph(&[])
            .context("Built-in pipeline is invalid")?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Pipeline name must not be empty");
        }

        if let Some(escalation) = &self.escalation {
            if escalation.iter().any(|part| part.trim().is_empty()) {
                bail!("Escalation command must not contain empty arguments");
            }
        }

        for task in &self.tasks {
            if task.name.trim().is_empty() {
                bail!("Task names must not be empty");
            }

            let mut step_names = HashSet::new();
            for step in &task.steps {
                if !step_names.insert(step.name.as_str()) {
                    bail!("Task '{}' has duplicate step '{}'", task.name, step.name);
                }
                if step.run.argv().is_empty() {
                    bail!("Step '{}' of task '{}' has an empty command", step.name, task.name);
                }
            }
        }

        // Registration, dependency and cycle checks. Placeholders are resolved
        // by `to_graph`, once command-line overrides are known.
        let mut registry = TaskRegistry::new();
        for task in &self.tasks {
            registry.register(Task {
                name: task.name.clone(),
                aliases: task.aliases.clone(),
                description: task.description.clone(),
                depends_on: task.depends_on.clone(),
                steps: Vec::new(),
            })?;
        }
        registry.validate()?;
        Ok(())
    }

    /// Escalation prefix for elevated steps
    pub fn escalation(&self) -> Vec<String> {
        self.escalation
            .clone()
            .unwrap_or_else(|| vec!["sudo".to_string()])
    }

    /// Variables with command-line overrides applied
    pub fn variables_with(&self, overrides: &[(String, String)]) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = self
            .variables
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        vars.extend(overrides.iter().cloned());
        vars
    }

    /// Render every task and register it, producing the validated task graph
    pub fn to_graph(&self, overrides: &[(String, String)]) -> Result<TaskGraph> {
        let vars = self.variables_with(overrides);
        let mut registry = TaskRegistry::new();

        for task_config in &self.tasks {
            let task = self.build_task(task_config, &vars)?;
            registry.register(task)?;
        }

        Ok(registry.validate()?)
    }

    fn build_task(&self, config: &TaskConfig, vars: &HashMap<String, String>) -> Result<Task> {
        let steps = config
            .steps
            .iter()
            .map(|step| {
                self.build_step(step, vars).with_context(|| {
                    format!("Step '{}' of task '{}'", step.name, config.name)
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Task {
            name: config.name.clone(),
            aliases: config.aliases.clone(),
            description: config.description.clone(),
            depends_on: config.depends_on.clone(),
            steps,
        })
    }

    fn build_step(&self, config: &StepConfig, vars: &HashMap<String, String>) -> Result<Step> {
        let mut argv = config.run.render(vars)?.into_iter();
        let program = argv.next().context("empty command")?;

        let working_dir = config
            .dir
            .as_deref()
            .map(|dir| render(dir, vars).map(PathBuf::from))
            .transpose()?;
        let skip_if_exists = config
            .skip_if_exists
            .as_deref()
            .map(|path| render(path, vars).map(PathBuf::from))
            .transpose()?;

        Ok(Step {
            name: config.name.clone(),
            program,
            args: argv.collect(),
            working_dir,
            privilege: config.privilege,
            on_failure: config.on_failure,
            skip_if_exists,
            timeout: config
                .timeout_secs
                .or(self.default_timeout_secs)
                .map(Duration::from_secs),
        })
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z0-9_.-]+)\s*\}\}").expect("placeholder pattern is valid")
    })
}

/// Replace `{{ name }}` placeholders; any undefined name is an error
fn render(template: &str, vars: &HashMap<String, String>) -> Result<String> {
    let mut missing: Option<String> = None;
    let rendered = placeholder().replace_all(template, |caps: &Captures| {
        match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| caps[1].to_string());
                String::new()
            }
        }
    });
    let rendered = rendered.into_owned();

    if let Some(name) = missing {
        bail!("undefined variable '{}'", name);
    }
    Ok(rendered)
}
