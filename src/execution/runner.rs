//! Sequential pipeline runner - flattens a task and executes its operations

use crate::collaborators::{CollaboratorError, OperationExecutor, Outcome};
use crate::core::{ExecutionStatus, OperationKind, RunSummary, TaskError, TaskRegistry};
use crate::execution::Session;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

/// Why a run stopped
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("Operation {index} ({kind}) failed: {cause}")]
    Operation {
        index: usize,
        kind: OperationKind,
        #[source]
        cause: CollaboratorError,
    },
}

impl RunError {
    /// Index of the failed operation in the flattened sequence
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            RunError::Operation { index, .. } => Some(*index),
            RunError::Task(_) => None,
        }
    }
}

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        name: String,
        total: usize,
    },
    OperationStarted {
        index: usize,
        total: usize,
        kind: OperationKind,
        summary: String,
    },
    OperationCompleted {
        index: usize,
        kind: OperationKind,
        elapsed_ms: u128,
    },
    /// A long-lived operation returned and keeps its resource open
    OperationHeld {
        index: usize,
        kind: OperationKind,
        description: String,
    },
    OperationFailed {
        index: usize,
        kind: OperationKind,
        error: String,
    },
    PipelineCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Runs tasks from a registry through an executor, one operation at a time
pub struct PipelineRunner<E> {
    registry: Arc<TaskRegistry>,
    executor: E,
    event_handlers: Vec<EventHandler>,
}

impl<E: OperationExecutor> PipelineRunner<E> {
    pub fn new(registry: impl Into<Arc<TaskRegistry>>, executor: E) -> Self {
        Self {
            registry: registry.into(),
            executor,
            event_handlers: Vec::new(),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Flatten `name` and execute its operations strictly in order
    ///
    /// The first failing operation stops the run; later operations never
    /// start and handles opened earlier in the run are closed. Long-lived
    /// operations return handles that are collected in the returned
    /// [`Session`] and stay open after this returns.
    pub async fn run(&self, name: &str) -> Result<Session, RunError> {
        let operations = self.registry.flatten(name)?;
        let total = operations.len();

        let mut summary = RunSummary::new(name);
        let execution_id = summary.execution_id;
        info!("Starting run: {} ({} operations, {})", name, total, execution_id);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            name: name.to_string(),
            total,
        });
        summary.start(total);

        let mut handles = Vec::new();
        for (index, operation) in operations.iter().enumerate() {
            let kind = operation.kind();
            self.emit_event(ExecutionEvent::OperationStarted {
                index,
                total,
                kind,
                summary: operation.summary(),
            });

            let started = Instant::now();
            match self.executor.execute(operation).await {
                Ok(Outcome::Completed) => {
                    summary.record_completed();
                    info!("Operation {} ({}) completed", index, kind);
                    self.emit_event(ExecutionEvent::OperationCompleted {
                        index,
                        kind,
                        elapsed_ms: started.elapsed().as_millis(),
                    });
                }
                Ok(Outcome::Held(handle)) => {
                    summary.record_completed();
                    info!("Operation {} ({}) holds {}", index, kind, handle.describe());
                    self.emit_event(ExecutionEvent::OperationHeld {
                        index,
                        kind,
                        description: handle.describe(),
                    });
                    handles.push(handle);
                }
                Err(cause) => {
                    error!("Operation {} ({}) failed: {}", index, kind, cause);
                    summary.fail(index);
                    for handle in &mut handles {
                        handle.close();
                    }
                    self.emit_event(ExecutionEvent::OperationFailed {
                        index,
                        kind,
                        error: cause.to_string(),
                    });
                    self.emit_event(ExecutionEvent::PipelineCompleted {
                        execution_id,
                        status: ExecutionStatus::Failed,
                    });
                    return Err(RunError::Operation { index, kind, cause });
                }
            }
        }

        summary.complete();
        info!("Run {} completed", name);
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            status: ExecutionStatus::Completed,
        });

        Ok(Session::new(summary, handles))
    }
}
