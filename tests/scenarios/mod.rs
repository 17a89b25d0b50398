//! Scenario-based tests for sitepipe

mod failure_handling;
mod long_lived;
mod path_templates;
mod prepare_pipeline;
mod task_graph;
