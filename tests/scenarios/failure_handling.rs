//! Test: Failure Handling - the first failing operation stops the run

use crate::helpers::*;
use sitepipe::collaborators::CollaboratorError;
use sitepipe::core::{Operation, OperationKind};
use sitepipe::execution::{ExecutionEvent, PipelineRunner, RunError};
use std::sync::{Arc, Mutex};

const THREE_STEPS: &str = r#"
tasks:
  op1:
    - op: exec
      command: step one
  op2:
    - op: exec
      command: step two
  op3:
    - op: exec
      command: step three
pipelines:
  deploy: [op1, op2, op3]
"#;

/// op2 fails, so op3 never runs and the error names op2
#[tokio::test]
async fn test_failure_short_circuits_pipeline() {
    let executor = RecordingExecutor::failing_when(|op| is_exec(op, "step two"));
    let runner = runner_from_yaml(THREE_STEPS, executor.clone());

    let err = runner.run("deploy").await.unwrap_err();

    assert_eq!(exec_commands(&executor), vec!["step one", "step two"]);
    match &err {
        RunError::Operation { index, kind, cause } => {
            assert_eq!(*index, 1);
            assert_eq!(*kind, OperationKind::Exec);
            assert!(matches!(cause, CollaboratorError::CommandFailed { .. }));
        }
        other => panic!("Expected operation failure, got {:?}", other),
    }
    assert!(err.to_string().starts_with("Operation 1 (exec) failed"));
    assert!(std::error::Error::source(&err).is_some());
}

#[tokio::test]
async fn test_builtin_deploy_stops_before_upload() {
    let executor =
        RecordingExecutor::failing_when(|op| matches!(op, Operation::CompileStyle { .. }));
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    let err = runner.run("deploy").await.unwrap_err();

    assert_eq!(err.failed_index(), Some(1));
    assert_eq!(
        executor.kinds(),
        vec![OperationKind::RemovePaths, OperationKind::CompileStyle]
    );
}

#[tokio::test]
async fn test_builtin_deploy_full_sequence() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    runner.run("deploy").await.unwrap();

    assert_eq!(
        executor.kinds(),
        vec![
            OperationKind::RemovePaths,
            OperationKind::CompileStyle,
            OperationKind::MinifyScript,
            OperationKind::CopyTree,
            OperationKind::Exec,
            OperationKind::MinifyMarkup,
            OperationKind::UploadTree,
        ]
    );
}

#[tokio::test]
async fn test_failure_closes_handles_opened_earlier() {
    let yaml = r#"
tasks:
  connect:
    - op: serve
      port: 9001
  broken:
    - op: exec
      command: explode
pipelines:
  dev: [connect, broken]
"#;
    let executor = RecordingExecutor::failing_when(|op| is_exec(op, "explode"));
    let runner = runner_from_yaml(yaml, executor.clone());

    assert!(runner.run("dev").await.is_err());
    assert_eq!(executor.handle_flags(), vec![false]);
}

#[tokio::test]
async fn test_failure_events() {
    let executor = RecordingExecutor::failing_when(|op| is_exec(op, "step two"));
    let mut runner = runner_from_yaml(THREE_STEPS, executor);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    runner.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let _ = runner.run("deploy").await;

    let events = events.lock().unwrap();
    let failed: Vec<usize> = events
        .iter()
        .filter_map(|event| match event {
            ExecutionEvent::OperationFailed { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![1]);

    let started = events
        .iter()
        .filter(|event| matches!(event, ExecutionEvent::OperationStarted { .. }))
        .count();
    assert_eq!(started, 2);
}
