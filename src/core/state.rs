//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run has not started
    Pending,
    /// Operations are executing
    Running,
    /// Every operation returned successfully
    Completed,
    /// An operation failed and the rest were not run
    Failed,
}

/// Summary of one `run` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Pipeline or task name that was run
    pub name: String,

    pub status: ExecutionStatus,

    pub started_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Number of operations in the flattened sequence
    pub total_operations: usize,

    /// Number of operations that returned successfully
    pub completed_operations: usize,

    /// Index of the operation that failed, if any
    pub failed_operation: Option<usize>,
}

impl RunSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            name: name.into(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_operations: 0,
            completed_operations: 0,
            failed_operation: None,
        }
    }

    /// Mark run as started
    pub fn start(&mut self, total_operations: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_operations = total_operations;
    }

    pub fn record_completed(&mut self) {
        self.completed_operations += 1;
    }

    /// Mark run as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark run as failed at `index`
    pub fn fail(&mut self, index: usize) {
        self.status = ExecutionStatus::Failed;
        self.failed_operation = Some(index);
        self.completed_at = Some(Utc::now());
    }
}
