//! Test: serve and watch handles outlive the run and drive the watch loop

use crate::helpers::*;
use sitepipe::collaborators::{ResourceHandle, WatchTrigger};
use sitepipe::core::{Operation, OperationKind};
use sitepipe::execution::PipelineRunner;
use std::path::PathBuf;
use std::time::Duration;

fn trigger(target: &str, tasks: &[&str]) -> WatchTrigger {
    WatchTrigger {
        target: target.to_string(),
        tasks: tasks.iter().map(|t| t.to_string()).collect(),
        paths: vec![PathBuf::from(format!("changed/{}", target))],
        livereload: true,
    }
}

/// Resolves once `executor` has sent `count` reloads (or after a timeout)
async fn reloads_reach(executor: RecordingExecutor, count: usize) {
    let wait = async {
        while executor.reloads() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    let _ = tokio::time::timeout(Duration::from_secs(5), wait).await;
}

#[tokio::test]
async fn test_base_leaves_serve_and_watch_open() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    let mut session = runner.run("base").await.unwrap();

    assert_eq!(
        executor.kinds(),
        vec![
            OperationKind::Serve,
            OperationKind::CompileStyle,
            OperationKind::MinifyScript,
            OperationKind::OpenBrowser,
            OperationKind::Watch,
        ]
    );

    // Neither handle closes the other once control is back with the caller
    tokio::task::yield_now().await;
    assert!(session.is_long_lived());
    assert_eq!(session.active_handles(), 2);
    assert_eq!(executor.handle_flags(), vec![true, true]);
    let kinds: Vec<OperationKind> = session.handles().iter().map(|h| h.kind()).collect();
    assert_eq!(kinds, vec![OperationKind::Serve, OperationKind::Watch]);

    session.close();
    assert_eq!(executor.handle_flags(), vec![false, false]);
}

#[tokio::test]
async fn test_open_browser_url_is_resolved() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    let _session = runner.run("base").await.unwrap();

    let urls: Vec<String> = executor
        .calls()
        .into_iter()
        .filter_map(|op| match op {
            Operation::OpenBrowser { url } => Some(url),
            _ => None,
        })
        .collect();
    assert_eq!(urls, vec!["http://hyde-dev/"]);
}

#[tokio::test]
async fn test_watch_trigger_runs_tasks_then_reloads() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    let session = runner.run("base").await.unwrap();
    assert!(executor.trigger(trigger("sass", &["sass:dev"])));

    let session = session
        .hold_until(&runner, reloads_reach(executor.clone(), 1))
        .await;

    assert_eq!(executor.reloads(), 1);
    let kinds = executor.kinds();
    assert_eq!(kinds.len(), 6);
    assert_eq!(kinds.last(), Some(&OperationKind::CompileStyle));

    // Holding ends by closing every handle
    assert!(!session.is_long_lived());
    assert_eq!(executor.handle_flags(), vec![false, false]);
}

#[tokio::test]
async fn test_failed_trigger_keeps_watching() {
    let executor = RecordingExecutor::failing_when(|op| is_exec(op, "jekyll build"));
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    let session = runner.run("build").await.unwrap();
    assert!(executor.trigger(trigger("jekyll", &["exec:build"])));
    assert!(executor.trigger(trigger("sass", &["sass:dev"])));

    session
        .hold_until(&runner, reloads_reach(executor.clone(), 1))
        .await;

    // The failed rebuild sends no reload; the stylesheet change does
    assert_eq!(executor.reloads(), 1);
    assert_eq!(exec_commands(&executor), vec!["jekyll build"]);
    assert_eq!(executor.kinds().last(), Some(&OperationKind::CompileStyle));
}

#[tokio::test]
async fn test_hold_without_watchers_waits_for_shutdown() {
    let executor = RecordingExecutor::new();
    let runner = PipelineRunner::new(builtin_registry(false), executor.clone());

    let session = runner.run("connect").await.unwrap();
    assert!(session.is_long_lived());

    let session = session
        .hold_until(&runner, tokio::time::sleep(Duration::from_millis(20)))
        .await;
    assert!(!session.is_long_lived());
    assert_eq!(executor.reloads(), 0);
}
