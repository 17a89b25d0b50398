//! Core domain models
//!
//! Path templates, primitive operations, the task graph, and the YAML
//! declaration that builds them.

pub mod config;
pub mod operation;
pub mod paths;
pub mod state;
pub mod task;

pub use operation::*;
pub use paths::{PathConfig, TemplateError};
pub use state::*;
pub use task::*;
