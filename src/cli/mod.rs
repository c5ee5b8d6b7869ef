//! Command-line interface

pub mod commands;
pub mod output;

use crate::core::config::PipelineConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Provisioning orchestrator for budou and its MeCab toolchain
#[derive(Debug, Parser, Clone)]
#[command(name = "provision")]
#[command(version)]
#[command(about = "Runs provisioning tasks for budou and MeCab", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Pipeline definition file (defaults to the built-in budou pipeline)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Print captured step output
    #[arg(short, long, global = true)]
    pub stream: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a task and everything it depends on
    Run(RunCommand),

    /// Validate a pipeline definition
    Validate(ValidateCommand),

    /// List the tasks of a pipeline definition
    List(ListCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }

    /// Load the selected pipeline definition
    pub fn load_config(&self) -> Result<PipelineConfig> {
        match &self.file {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("Failed to load pipeline from {}", path.display())),
            None => PipelineConfig::builtin(),
        }
    }
}
