//! Pipeline execution

pub mod runner;
pub mod session;

pub use runner::{EventHandler, ExecutionEvent, PipelineRunner, RunError};
pub use session::Session;
