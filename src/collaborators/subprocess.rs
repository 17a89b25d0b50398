//! External tool invocation - spawns a program and waits for it

use crate::collaborators::CollaboratorError;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// A fully described external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    /// Environment additions; values are never shown in `display`
    envs: Vec<(String, String)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    /// Split a shell-style command line into program and arguments
    pub fn from_command_line(line: &str) -> Result<Self, CollaboratorError> {
        let words = shlex::split(line)
            .ok_or_else(|| CollaboratorError::InvalidCommand(line.to_string()))?;
        let mut words = words.into_iter();
        let program = words
            .next()
            .ok_or_else(|| CollaboratorError::InvalidCommand("empty command".to_string()))?;
        Ok(Self::new(program).args(words))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Command line for logs and error messages
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run to completion and return stdout
    ///
    /// # Errors
    /// Returns `CollaboratorError` if:
    /// - The program cannot be spawned
    /// - It exits with a non-zero status
    pub async fn output(&self) -> Result<String, CollaboratorError> {
        debug!("Spawning `{}`", self.display());

        let mut command = Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }

        let output = command
            .output()
            .await
            .map_err(|source| CollaboratorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            warn!("`{}` exited with code {}", self.display(), code);
            return Err(CollaboratorError::CommandFailed {
                command: self.display(),
                code,
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("`{}` returned {} bytes of output", self.program, stdout.len());
        Ok(stdout)
    }

    /// Run to completion, logging stdout at debug level
    pub async fn run(&self) -> Result<(), CollaboratorError> {
        let stdout = self.output().await?;
        for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
            debug!("[{}] {}", self.program, line);
        }
        Ok(())
    }
}
