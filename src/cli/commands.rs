//! CLI command definitions

use clap::Args;

/// Run a pipeline or task
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Pipeline or task name (e.g. deploy, sass:dev)
    pub name: String,
}

/// Show the flattened operations of a pipeline or task
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Pipeline or task name
    pub name: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Validate the build declaration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List pipelines and tasks
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
