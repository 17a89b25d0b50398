//! Build declaration loaded from YAML

use crate::collaborators::tools::ToolsConfig;
use crate::core::{
    operation::Operation,
    paths::PathConfig,
    task::{TaskDefinition, TaskElement, TaskError, TaskRegistry},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// File name looked up in the working directory when no config is given
pub const DEFAULT_CONFIG_FILE: &str = "sitepipe.yaml";

/// Declaration shipped with the tool, used when no config file is found
const BUILTIN_CONFIG: &str = include_str!("../../sitepipe.yaml");

/// Top-level build declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Site name (optional)
    #[serde(default)]
    pub name: Option<String>,

    /// Named path fragments available as `<%= path.name %>` tokens
    #[serde(default)]
    pub paths: PathConfig,

    /// External tool executables
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Whether tasks flagged `destructive` may run
    #[serde(default)]
    pub allow_destructive: bool,

    /// Task definitions
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskConfig>,

    /// Entry points, each an ordered list of task names
    #[serde(default)]
    pub pipelines: BTreeMap<String, Vec<String>>,
}

/// Task as written in YAML: a bare step list or a described task
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskConfig {
    Steps(Vec<StepConfig>),
    Detailed(DetailedTask),
}

/// Task with a description or flags besides its steps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetailedTask {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub destructive: bool,
    pub steps: Vec<StepConfig>,
}

/// Step as written in YAML: a task name or an inline operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepConfig {
    Reference(String),
    Operation(Operation),
}

impl TaskConfig {
    pub fn steps(&self) -> &[StepConfig] {
        match self {
            TaskConfig::Steps(steps) => steps,
            TaskConfig::Detailed(task) => &task.steps,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            TaskConfig::Steps(_) => None,
            TaskConfig::Detailed(task) => task.description.as_deref(),
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, TaskConfig::Detailed(task) if task.destructive)
    }
}

impl SiteConfig {
    /// Load the declaration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Parse the declaration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SiteConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// The declaration shipped with the tool
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_CONFIG).context("Built-in declaration is invalid")
    }

    /// Load `path` if given, else `./sitepipe.yaml` if present, else the
    /// built-in declaration
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => Self::builtin(),
        }
    }

    /// Replace path entries with command-line overrides
    pub fn apply_path_overrides(&mut self, overrides: &[(String, String)]) {
        self.paths = self.paths.with_overrides(overrides);
    }

    /// Validate the declaration
    pub fn validate(&self) -> Result<()> {
        // Task and pipeline names share one namespace
        for name in self.pipelines.keys() {
            if self.tasks.contains_key(name) {
                anyhow::bail!("'{}' is declared both as a task and as a pipeline", name);
            }
        }

        let known: HashSet<&str> = self
            .tasks
            .keys()
            .chain(self.pipelines.keys())
            .map(String::as_str)
            .collect();

        for (pipeline, tasks) in &self.pipelines {
            for task in tasks {
                if !known.contains(task.as_str()) {
                    anyhow::bail!(
                        "Pipeline '{}' references non-existent task '{}'",
                        pipeline,
                        task
                    );
                }
            }
        }

        for (name, task) in &self.tasks {
            for step in task.steps() {
                if let StepConfig::Reference(target) = step {
                    if !known.contains(target.as_str()) {
                        anyhow::bail!(
                            "Task '{}' references non-existent task '{}'",
                            name,
                            target
                        );
                    }
                }
            }
        }

        self.paths
            .resolve_all()
            .context("Path configuration does not resolve")?;

        // Cycles and watch targets are checked on the resolved graph
        self.to_registry(true)?.validate()?;

        Ok(())
    }

    /// Build the task registry, resolving every operation against the paths
    pub fn to_registry(&self, allow_destructive: bool) -> Result<TaskRegistry, TaskError> {
        let mut registry =
            TaskRegistry::new().with_destructive(allow_destructive || self.allow_destructive);

        for (name, task) in &self.tasks {
            let elements = task
                .steps()
                .iter()
                .map(|step| match step {
                    StepConfig::Reference(target) => Ok(TaskElement::Reference(target.clone())),
                    StepConfig::Operation(operation) => operation
                        .resolve(&self.paths)
                        .map(TaskElement::Primitive)
                        .map_err(|source| TaskError::Template {
                            task: name.clone(),
                            source,
                        }),
                })
                .collect::<Result<Vec<_>, TaskError>>()?;

            registry.insert(TaskDefinition {
                name: name.clone(),
                description: task.description().map(str::to_string),
                elements,
                destructive: task.is_destructive(),
                pipeline: false,
            });
        }

        for (name, tasks) in &self.pipelines {
            registry.register_pipeline(name.clone(), tasks.clone());
        }

        Ok(registry)
    }
}
