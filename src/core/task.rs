//! Task registry - named tasks, composition by reference, and flattening

use crate::core::operation::Operation;
use crate::core::paths::TemplateError;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while building or flattening the task graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Cyclic task reference: {}", chain.join(" -> "))]
    CyclicTask { chain: Vec<String> },

    #[error("Task '{0}' is destructive; enable allow_destructive to run it")]
    DestructiveDisabled(String),

    #[error("Task '{task}': {source}")]
    Template {
        task: String,
        #[source]
        source: TemplateError,
    },
}

/// One element of a task: a primitive operation or a reference to a task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskElement {
    Primitive(Operation),
    Reference(String),
}

/// A registered task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDefinition {
    pub name: String,
    pub description: Option<String>,
    pub elements: Vec<TaskElement>,
    /// Destructive tasks only run when the registry allows them
    pub destructive: bool,
    /// Pipelines are top-level entry points made of references only
    pub pipeline: bool,
}

/// Mapping from task name to its element list
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, TaskDefinition>,
    order: Vec<String>,
    allow_destructive: bool,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow destructive tasks to be flattened
    pub fn with_destructive(mut self, allow: bool) -> Self {
        self.allow_destructive = allow;
        self
    }

    /// Register (or replace) a task
    pub fn register(&mut self, name: impl Into<String>, elements: Vec<TaskElement>) {
        let name = name.into();
        self.insert(TaskDefinition {
            name,
            description: None,
            elements,
            destructive: false,
            pipeline: false,
        });
    }

    /// Register a pipeline as an ordered list of task names
    pub fn register_pipeline(&mut self, name: impl Into<String>, tasks: Vec<String>) {
        let name = name.into();
        self.insert(TaskDefinition {
            name,
            description: None,
            elements: tasks.into_iter().map(TaskElement::Reference).collect(),
            destructive: false,
            pipeline: true,
        });
    }

    /// Register a fully described task definition
    pub fn insert(&mut self, definition: TaskDefinition) {
        if !self.tasks.contains_key(&definition.name) {
            self.order.push(definition.name.clone());
        }
        self.tasks.insert(definition.name.clone(), definition);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn task(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    /// All definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &TaskDefinition> {
        self.order.iter().filter_map(|name| self.tasks.get(name))
    }

    pub fn pipeline_names(&self) -> Vec<&str> {
        self.definitions()
            .filter(|d| d.pipeline)
            .map(|d| d.name.as_str())
            .collect()
    }

    pub fn task_names(&self) -> Vec<&str> {
        self.definitions()
            .filter(|d| !d.pipeline)
            .map(|d| d.name.as_str())
            .collect()
    }

    /// Expand `name` depth-first into its ordered primitive operations
    ///
    /// References are replaced in place by the flattened sequence of the
    /// referenced task. Destructive tasks reached by reference are skipped
    /// unless the registry allows them.
    pub fn flatten(&self, name: &str) -> Result<Vec<Operation>, TaskError> {
        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;
        if task.destructive && !self.allow_destructive {
            return Err(TaskError::DestructiveDisabled(name.to_string()));
        }

        let mut operations = Vec::new();
        let mut stack = Vec::new();
        self.expand(name, self.allow_destructive, &mut stack, &mut operations)?;
        debug!("Flattened '{}' into {} operations", name, operations.len());
        Ok(operations)
    }

    fn expand(
        &self,
        name: &str,
        allow_destructive: bool,
        stack: &mut Vec<String>,
        out: &mut Vec<Operation>,
    ) -> Result<(), TaskError> {
        if let Some(start) = stack.iter().position(|entry| entry == name) {
            let mut chain = stack[start..].to_vec();
            chain.push(name.to_string());
            return Err(TaskError::CyclicTask { chain });
        }

        let task = self
            .tasks
            .get(name)
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;

        stack.push(name.to_string());
        for element in &task.elements {
            match element {
                TaskElement::Primitive(operation) => out.push(operation.clone()),
                TaskElement::Reference(target) => {
                    let referenced = self
                        .tasks
                        .get(target)
                        .ok_or_else(|| TaskError::UnknownTask(target.clone()))?;
                    if referenced.destructive && !allow_destructive {
                        warn!(
                            "Skipping destructive task '{}' referenced by '{}'",
                            target, name
                        );
                        continue;
                    }
                    self.expand(target, allow_destructive, stack, out)?;
                }
            }
        }
        stack.pop();

        Ok(())
    }

    /// Check the whole graph: every task flattens and every task a watch
    /// target triggers exists
    pub fn validate(&self) -> Result<(), TaskError> {
        for name in &self.order {
            let mut operations = Vec::new();
            let mut stack = Vec::new();
            self.expand(name, true, &mut stack, &mut operations)?;

            for operation in &operations {
                if let Operation::Watch { targets, .. } = operation {
                    for task in targets.iter().flat_map(|t| t.tasks.iter()) {
                        if !self.contains(task) {
                            return Err(TaskError::UnknownTask(task.clone()));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
