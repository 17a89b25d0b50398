//! sitepipe - declarative build pipelines for static sites

pub mod cli;
pub mod collaborators;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use collaborators::{CollaboratorError, HostExecutor, OperationExecutor, Outcome, ResourceHandle};
pub use crate::core::config::SiteConfig;
pub use crate::core::{ExecutionStatus, Operation, OperationKind, PathConfig, TaskElement, TaskError, TaskRegistry};
pub use execution::{ExecutionEvent, PipelineRunner, RunError, Session};
