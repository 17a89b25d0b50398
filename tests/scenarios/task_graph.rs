//! Test: task graph flattening through the declaration

use crate::helpers::*;
use sitepipe::core::config::SiteConfig;
use sitepipe::core::{Operation, TaskElement, TaskError, TaskRegistry};
use sitepipe::execution::RunError;

fn exec(command: &str) -> TaskElement {
    TaskElement::Primitive(Operation::Exec {
        command: command.to_string(),
        cwd: None,
    })
}

#[test]
fn test_mutual_reference_is_cyclic() {
    let mut registry = TaskRegistry::new();
    registry.register("x", vec![exec("a"), TaskElement::Reference("y".to_string())]);
    registry.register("y", vec![TaskElement::Reference("x".to_string())]);

    match registry.flatten("x") {
        Err(TaskError::CyclicTask { chain }) => assert_eq!(chain, vec!["x", "y", "x"]),
        other => panic!("Expected cyclic task, got {:?}", other),
    }
}

#[test]
fn test_flatten_is_idempotent() {
    let registry = builtin_registry(false);
    for name in ["prepare", "base", "build", "deploy"] {
        let first = registry.flatten(name).unwrap();
        let second = registry.flatten(name).unwrap();
        assert_eq!(first, second, "flattening {} changed between calls", name);
    }
}

#[test]
fn test_shared_task_expands_at_each_reference() {
    let yaml = r#"
tasks:
  style:
    - op: exec
      command: compile
  twice: [style, style]
pipelines:
  all: [twice, style]
"#;
    let config = SiteConfig::from_yaml(yaml).unwrap();
    let operations = config.to_registry(false).unwrap().flatten("all").unwrap();
    assert_eq!(operations.len(), 3);
}

#[test]
fn test_pipelines_listed_separately() {
    let registry = builtin_registry(false);
    let mut pipelines = registry.pipeline_names();
    pipelines.sort();
    assert_eq!(pipelines, vec!["base", "build", "deploy", "prepare"]);
    assert!(registry.task_names().contains(&"sass:dev"));
    assert!(!registry.task_names().contains(&"deploy"));
}

#[tokio::test]
async fn test_unknown_task_fails_before_any_operation() {
    let executor = RecordingExecutor::new();
    let runner = sitepipe::execution::PipelineRunner::new(builtin_registry(false), executor.clone());

    let err = runner.run("publish").await.unwrap_err();
    assert!(matches!(err, RunError::Task(TaskError::UnknownTask(ref name)) if name == "publish"));
    assert!(executor.calls().is_empty());
}
