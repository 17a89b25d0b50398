//! Test utility functions for sitepipe
#![allow(dead_code)]

use async_trait::async_trait;
use sitepipe::collaborators::{
    CollaboratorError, OperationExecutor, Outcome, ResourceHandle, WatchTrigger,
};
use sitepipe::core::config::SiteConfig;
use sitepipe::core::{Operation, OperationKind, TaskRegistry};
use sitepipe::execution::PipelineRunner;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type FailurePredicate = Arc<dyn Fn(&Operation) -> bool + Send + Sync>;

/// Executor that records every operation instead of performing it
///
/// `serve` and `watch` return mock handles whose active flags can be
/// inspected; watch triggers can be injected with [`RecordingExecutor::trigger`].
#[derive(Clone)]
pub struct RecordingExecutor {
    calls: Arc<Mutex<Vec<Operation>>>,
    fail_when: FailurePredicate,
    reloads: Arc<AtomicUsize>,
    flags: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
    watch_senders: Arc<Mutex<Vec<UnboundedSender<WatchTrigger>>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::failing_when(|_| false)
    }

    /// Fail every operation matching `predicate`
    pub fn failing_when<F>(predicate: F) -> Self
    where
        F: Fn(&Operation) -> bool + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(predicate),
            reloads: Arc::new(AtomicUsize::new(0)),
            flags: Arc::new(Mutex::new(Vec::new())),
            watch_senders: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<OperationKind> {
        self.calls().iter().map(Operation::kind).collect()
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }

    /// Active flags of every handle handed out, in order
    pub fn handle_flags(&self) -> Vec<bool> {
        self.flags
            .lock()
            .unwrap()
            .iter()
            .map(|flag| flag.load(Ordering::SeqCst))
            .collect()
    }

    /// Send a trigger through the most recent watch handle
    pub fn trigger(&self, trigger: WatchTrigger) -> bool {
        self.watch_senders
            .lock()
            .unwrap()
            .last()
            .is_some_and(|sender| sender.send(trigger).is_ok())
    }

    fn handle(&self, kind: OperationKind, triggers: Option<UnboundedReceiver<WatchTrigger>>) -> MockHandle {
        let active = Arc::new(AtomicBool::new(true));
        self.flags.lock().unwrap().push(active.clone());
        MockHandle {
            kind,
            active,
            triggers,
        }
    }
}

#[async_trait]
impl OperationExecutor for RecordingExecutor {
    async fn execute(&self, op: &Operation) -> Result<Outcome, CollaboratorError> {
        self.calls.lock().unwrap().push(op.clone());

        if (self.fail_when)(op) {
            return Err(CollaboratorError::CommandFailed {
                command: op.summary(),
                code: 1,
                stderr: "mock failure".to_string(),
            });
        }

        match op {
            Operation::Serve { .. } => Ok(Outcome::Held(Box::new(
                self.handle(OperationKind::Serve, None),
            ))),
            Operation::Watch { .. } => {
                let (sender, receiver) = mpsc::unbounded_channel();
                self.watch_senders.lock().unwrap().push(sender);
                Ok(Outcome::Held(Box::new(
                    self.handle(OperationKind::Watch, Some(receiver)),
                )))
            }
            _ => Ok(Outcome::Completed),
        }
    }

    fn notify_reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockHandle {
    kind: OperationKind,
    active: Arc<AtomicBool>,
    triggers: Option<UnboundedReceiver<WatchTrigger>>,
}

impl ResourceHandle for MockHandle {
    fn kind(&self) -> OperationKind {
        self.kind
    }

    fn describe(&self) -> String {
        format!("mock {}", self.kind)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn take_triggers(&mut self) -> Option<UnboundedReceiver<WatchTrigger>> {
        self.triggers.take()
    }

    fn close(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

/// Registry built from the shipped declaration
pub fn builtin_registry(allow_destructive: bool) -> TaskRegistry {
    SiteConfig::builtin()
        .expect("built-in declaration parses")
        .to_registry(allow_destructive)
        .expect("built-in declaration resolves")
}

/// Runner over a YAML declaration with a recording executor
pub fn runner_from_yaml(yaml: &str, executor: RecordingExecutor) -> PipelineRunner<RecordingExecutor> {
    let config = SiteConfig::from_yaml(yaml).expect("declaration parses");
    let registry = config.to_registry(false).expect("declaration resolves");
    PipelineRunner::new(registry, executor)
}

/// Is the operation an `exec` of `command`
pub fn is_exec(op: &Operation, command: &str) -> bool {
    matches!(op, Operation::Exec { command: c, .. } if c == command)
}

pub fn exec_commands(executor: &RecordingExecutor) -> Vec<String> {
    executor
        .calls()
        .into_iter()
        .filter_map(|op| match op {
            Operation::Exec { command, .. } => Some(command),
            _ => None,
        })
        .collect()
}
