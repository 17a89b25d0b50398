//! Test: the shipped `prepare` pipeline and destructive cleanup

use crate::helpers::*;
use sitepipe::core::{ExecutionStatus, Operation, OperationKind, TaskError};
use sitepipe::execution::{PipelineRunner, RunError};

#[tokio::test]
async fn test_prepare_scaffolds_then_fetches_dependencies() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    let session = runner.run("prepare").await.unwrap();

    // clean:prepare is destructive and skipped by default
    assert_eq!(
        executor.kinds(),
        vec![
            OperationKind::MakeDirectories,
            OperationKind::CompileStyle,
            OperationKind::FetchDependencies,
        ]
    );
    assert_eq!(session.summary().status, ExecutionStatus::Completed);
    assert_eq!(session.summary().completed_operations, 3);
    assert!(!session.is_long_lived());

    let calls = executor.calls();
    match &calls[0] {
        Operation::MakeDirectories { paths } => {
            assert_eq!(paths.len(), 6);
            assert!(paths.contains(&"../../template/assets/css".to_string()));
            assert!(paths.contains(&"../../source/_posts".to_string()));
        }
        other => panic!("Expected make-directories, got {:?}", other),
    }
    match &calls[2] {
        Operation::FetchDependencies {
            target_dir,
            clean_cache,
        } => {
            assert_eq!(target_dir, "../../template/assets");
            assert!(clean_cache);
        }
        other => panic!("Expected fetch-dependencies, got {:?}", other),
    }
}

#[tokio::test]
async fn test_prepare_with_destructive_cleanup() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(true), executor.clone());

    runner.run("prepare").await.unwrap();

    let calls = executor.calls();
    assert_eq!(calls.len(), 4);
    match calls.last().unwrap() {
        Operation::RemovePaths { paths, force } => {
            assert!(force);
            assert_eq!(
                paths,
                &vec![
                    "../../.git".to_string(),
                    "../../.gitignore".to_string(),
                    "../../README.md".to_string(),
                ]
            );
        }
        other => panic!("Expected remove-paths, got {:?}", other),
    }
}

#[tokio::test]
async fn test_destructive_task_run_directly_is_refused() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    let err = runner.run("clean:prepare").await.unwrap_err();

    assert!(matches!(
        err,
        RunError::Task(TaskError::DestructiveDisabled(ref name)) if name == "clean:prepare"
    ));
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn test_single_task_can_be_run() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    runner.run("sass:dist").await.unwrap();

    match executor.calls().as_slice() {
        [Operation::CompileStyle { input, output, .. }] => {
            assert_eq!(input, "../sass/base.scss");
            assert_eq!(output, "../../source/assets/css/base.css");
        }
        other => panic!("Expected one compile-style, got {:?}", other),
    }
}
