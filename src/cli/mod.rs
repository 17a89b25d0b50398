//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{parse_key_value, ListCommand, PlanCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Declarative build pipelines for static sites
#[derive(Debug, Parser, Clone)]
#[command(name = "sitepipe")]
#[command(version)]
#[command(about = "Declarative build pipelines for static sites", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the build declaration (default: ./sitepipe.yaml, else built-in)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path overrides (key=value)
    #[arg(long, global = true, value_parser = parse_key_value)]
    pub set: Vec<(String, String)>,

    /// Allow destructive tasks such as clean:prepare
    #[arg(long, global = true)]
    pub allow_destructive: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a pipeline or task
    Run(RunCommand),

    /// Show the operations a pipeline or task expands to
    Plan(PlanCommand),

    /// Validate the build declaration
    Validate(ValidateCommand),

    /// List pipelines and tasks
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
}
