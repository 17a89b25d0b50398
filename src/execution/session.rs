//! Run sessions - the long-lived resources a run left open

use crate::collaborators::{OperationExecutor, ResourceHandle, WatchTrigger};
use crate::core::RunSummary;
use crate::execution::PipelineRunner;
use std::future::Future;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info, warn};

/// Outcome of a successful run
///
/// Holds the handles of `serve` and `watch` operations. Dropping the
/// session releases them.
pub struct Session {
    summary: RunSummary,
    handles: Vec<Box<dyn ResourceHandle>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("summary", &self.summary)
            .field(
                "handles",
                &self.handles.iter().map(|h| h.describe()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Session {
    pub fn new(summary: RunSummary, handles: Vec<Box<dyn ResourceHandle>>) -> Self {
        Self { summary, handles }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn handles(&self) -> &[Box<dyn ResourceHandle>] {
        &self.handles
    }

    pub fn active_handles(&self) -> usize {
        self.handles.iter().filter(|h| h.is_active()).count()
    }

    /// Whether the run left resources open that the caller should wait on
    pub fn is_long_lived(&self) -> bool {
        self.active_handles() > 0
    }

    /// Take ownership of another session's handles
    pub fn absorb(&mut self, mut other: Session) {
        self.handles.append(&mut other.handles);
    }

    /// Close every handle
    pub fn close(&mut self) {
        for handle in &mut self.handles {
            debug!("Closing {}", handle.describe());
            handle.close();
        }
    }

    /// Dispatch watch triggers until Ctrl-C, then close
    pub async fn hold<E: OperationExecutor>(self, runner: &PipelineRunner<E>) {
        self.hold_until(runner, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;
    }

    /// Dispatch watch triggers until `shutdown` resolves, then close
    ///
    /// Each trigger runs its tasks through `runner`. A failing task is
    /// logged and the watch continues. Browsers are told to reload only
    /// after every task of a trigger succeeded.
    pub async fn hold_until<E, F>(mut self, runner: &PipelineRunner<E>, shutdown: F) -> Session
    where
        E: OperationExecutor,
        F: Future<Output = ()>,
    {
        let mut triggers = self.merge_triggers();
        tokio::pin!(shutdown);

        info!("Holding {} open resources", self.active_handles());
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
                trigger = triggers.recv() => match trigger {
                    Some(first) => {
                        for trigger in coalesce(first, &mut triggers) {
                            self.dispatch(runner, trigger).await;
                        }
                    }
                    None => {
                        debug!("No watchers left; waiting for shutdown");
                        (&mut shutdown).await;
                        break;
                    }
                },
            }
        }

        self.close();
        self
    }

    fn merge_triggers(&mut self) -> UnboundedReceiver<WatchTrigger> {
        let (sender, receiver) = mpsc::unbounded_channel();
        for handle in &mut self.handles {
            if let Some(mut source) = handle.take_triggers() {
                let sender = sender.clone();
                tokio::spawn(async move {
                    while let Some(trigger) = source.recv().await {
                        if sender.send(trigger).is_err() {
                            break;
                        }
                    }
                });
            }
        }
        receiver
    }

    async fn dispatch<E: OperationExecutor>(&mut self, runner: &PipelineRunner<E>, trigger: WatchTrigger) {
        info!(
            "Change in '{}' ({} paths), running [{}]",
            trigger.target,
            trigger.paths.len(),
            trigger.tasks.join(", ")
        );

        for task in &trigger.tasks {
            match runner.run(task).await {
                Ok(session) => self.absorb(session),
                Err(e) => {
                    warn!("Task '{}' triggered by '{}' failed: {}", task, trigger.target, e);
                    return;
                }
            }
        }

        if trigger.livereload {
            runner.executor().notify_reload();
        }
    }
}

/// Merge the triggers already queued behind `first`, one per target
fn coalesce(first: WatchTrigger, queue: &mut UnboundedReceiver<WatchTrigger>) -> Vec<WatchTrigger> {
    let mut batch = vec![first];
    while let Ok(next) = queue.try_recv() {
        match batch.iter_mut().find(|t| t.target == next.target) {
            Some(existing) => {
                for path in next.paths {
                    if !existing.paths.contains(&path) {
                        existing.paths.push(path);
                    }
                }
            }
            None => batch.push(next),
        }
    }
    batch
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
