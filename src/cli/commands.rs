//! CLI command definitions

use clap::Args;
use std::path::PathBuf;

/// Run a task
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Task to run (e.g. init, init-dev, install, install-mecab, test, docs)
    pub task: String,

    /// Directory step paths are relative to (defaults to the current directory)
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Variable overrides (key=value)
    #[arg(long, value_parser = parse_key_value)]
    pub var: Vec<(String, String)>,

    /// Print the steps that would run without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Run elevated steps without the escalation prefix (already root)
    #[arg(long)]
    pub no_elevate: bool,
}

/// Validate a pipeline definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List tasks
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid key=value pair: {}", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}
