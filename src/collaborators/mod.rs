//! Collaborators that carry out primitive operations

pub mod assets;
pub mod browser;
pub mod dependencies;
pub mod error;
pub mod fs;
pub mod server;
pub mod subprocess;
pub mod tools;
pub mod upload;
pub mod watch;

use crate::core::{Operation, OperationKind};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

pub use error::CollaboratorError;
pub use server::{ReloadHub, ServerHandle};
pub use subprocess::ToolCommand;
pub use tools::ToolsConfig;
pub use upload::UploadRequest;
pub use watch::{WatchHandle, WatchTrigger};

/// Trait for operation execution - allows for different implementations
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    /// Carry out one resolved operation
    async fn execute(&self, op: &Operation) -> Result<Outcome, CollaboratorError>;

    /// Tell connected browsers to reload
    fn notify_reload(&self) {}
}

/// Result of a successful operation
pub enum Outcome {
    /// The operation finished its work
    Completed,
    /// The operation returned but keeps a resource open
    Held(Box<dyn ResourceHandle>),
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Completed => f.write_str("Completed"),
            Outcome::Held(handle) => f.debug_tuple("Held").field(&handle.describe()).finish(),
        }
    }
}

/// A resource that stays active after its operation returned
pub trait ResourceHandle: Send {
    fn kind(&self) -> OperationKind;

    fn describe(&self) -> String;

    fn is_active(&self) -> bool;

    /// Change notifications produced by this resource; yields the receiver once
    fn take_triggers(&mut self) -> Option<UnboundedReceiver<WatchTrigger>> {
        None
    }

    /// Release the resource
    fn close(&mut self) {}
}

/// Executor backed by the host filesystem, external tools, and sockets
#[derive(Debug, Clone, Default)]
pub struct HostExecutor {
    tools: ToolsConfig,
    reload: ReloadHub,
}

impl HostExecutor {
    pub fn new(tools: ToolsConfig) -> Self {
        Self {
            tools,
            reload: ReloadHub::new(),
        }
    }
}

/// Run synchronous filesystem work off the async worker threads
async fn blocking<T, F>(work: F) -> Result<T, CollaboratorError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CollaboratorError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CollaboratorError::Internal(format!("blocking task failed: {}", e)))?
}

#[async_trait]
impl OperationExecutor for HostExecutor {
    async fn execute(&self, op: &Operation) -> Result<Outcome, CollaboratorError> {
        debug!("Executing {}", op.summary());

        match op {
            Operation::Serve {
                port,
                root,
                livereload,
            } => {
                let handle =
                    server::serve(*port, PathBuf::from(root), *livereload, self.reload.clone())
                        .await?;
                return Ok(Outcome::Held(Box::new(handle)));
            }
            Operation::Watch {
                targets,
                livereload,
            } => {
                let handle = watch::watch(targets, *livereload)?;
                return Ok(Outcome::Held(Box::new(handle)));
            }
            Operation::CompileStyle {
                input,
                output,
                style,
            } => {
                assets::compile_style(&self.tools.sass, input, output, *style).await?;
            }
            Operation::MinifyScript { input, output } => {
                assets::minify_script(&self.tools.uglifyjs, input, output).await?;
            }
            Operation::MinifyMarkup {
                root,
                pattern,
                options,
            } => {
                assets::minify_markup(&self.tools.html_minifier, root, pattern, options).await?;
            }
            Operation::Exec { command, cwd } => {
                let mut command = ToolCommand::from_command_line(command)?;
                if let Some(cwd) = cwd {
                    command = command.current_dir(cwd);
                }
                command.run().await?;
            }
            Operation::MakeDirectories { paths } => {
                let paths = paths.clone();
                blocking(move || fs::make_directories(&paths)).await?;
            }
            Operation::RemovePaths { paths, force } => {
                let paths = paths.clone();
                let force = *force;
                blocking(move || fs::remove_paths(&paths, force)).await?;
            }
            Operation::CopyTree { src, dest, include } => {
                let src = PathBuf::from(src);
                let dest = PathBuf::from(dest);
                let include = include.clone();
                blocking(move || fs::copy_tree(&src, &dest, &include)).await?;
            }
            Operation::FetchDependencies {
                target_dir,
                clean_cache,
            } => {
                dependencies::fetch_dependencies(&self.tools.bower, target_dir, *clean_cache)
                    .await?;
            }
            Operation::UploadTree {
                local,
                host,
                port,
                remote,
                auth_key,
                exclusions,
            } => {
                let request = UploadRequest {
                    local: local.clone(),
                    host: host.clone(),
                    port: *port,
                    remote: remote.clone(),
                    auth_key: auth_key.clone(),
                    exclusions: exclusions.clone(),
                };
                upload::upload_tree(&self.tools.lftp, &request).await?;
            }
            Operation::OpenBrowser { url } => {
                browser::open(url)?;
            }
        }

        Ok(Outcome::Completed)
    }

    fn notify_reload(&self) {
        self.reload.notify();
    }
}
