//! File watching for the development loop

use crate::collaborators::fs::contains_glob_chars;
use crate::collaborators::{CollaboratorError, ResourceHandle};
use crate::core::{OperationKind, WatchTarget};
use glob::Pattern;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// A change matched a watch target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTrigger {
    /// Name of the watch target
    pub target: String,
    /// Tasks to run in response
    pub tasks: Vec<String>,
    /// Changed paths that matched
    pub paths: Vec<PathBuf>,
    /// Whether browsers should reload once the tasks succeed
    pub livereload: bool,
}

/// Split a pattern into its literal directory prefix and the glob part
///
/// `../site/**/*.html` becomes (`../site`, `Some("**/*.html")`). A pattern
/// without glob characters is returned whole with `None`.
pub fn split_glob(pattern: &str) -> (PathBuf, Option<String>) {
    let parts: Vec<&str> = pattern.split('/').collect();
    match parts.iter().position(|part| contains_glob_chars(part)) {
        None => (PathBuf::from(pattern), None),
        Some(first_glob) => {
            let prefix = parts[..first_glob].join("/");
            let prefix = if prefix.is_empty() && pattern.starts_with('/') {
                "/".to_string()
            } else if prefix.is_empty() {
                ".".to_string()
            } else {
                prefix
            };
            (PathBuf::from(prefix), Some(parts[first_glob..].join("/")))
        }
    }
}

fn canonical(path: &Path) -> Result<PathBuf, CollaboratorError> {
    path.canonicalize()
        .map_err(|e| CollaboratorError::Watch(format!("cannot watch {}: {}", path.display(), e)))
}

fn compile_pattern(raw: &str) -> Result<(PathBuf, Pattern), CollaboratorError> {
    let invalid = |e: glob::PatternError| CollaboratorError::InvalidPattern {
        pattern: raw.to_string(),
        message: e.to_string(),
    };

    let (prefix, rest) = split_glob(raw);
    match rest {
        Some(rest) => {
            let base = canonical(&prefix)?;
            let full = format!("{}/{}", Pattern::escape(&base.to_string_lossy()), rest);
            Ok((base, Pattern::new(&full).map_err(invalid)?))
        }
        None => {
            let parent = match prefix.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let base = canonical(&parent)?;
            let file = match prefix.file_name() {
                Some(name) => base.join(name),
                None => base.clone(),
            };
            let pattern = Pattern::new(&Pattern::escape(&file.to_string_lossy())).map_err(invalid)?;
            Ok((base, pattern))
        }
    }
}

struct CompiledTarget {
    name: String,
    tasks: Vec<String>,
    patterns: Vec<Pattern>,
}

impl CompiledTarget {
    fn matching(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        paths
            .iter()
            .filter(|path| self.patterns.iter().any(|p| p.matches_path(path)))
            .cloned()
            .collect()
    }
}

fn compile_targets(
    targets: &[WatchTarget],
) -> Result<(Vec<CompiledTarget>, BTreeSet<PathBuf>), CollaboratorError> {
    let mut compiled = Vec::new();
    let mut roots = BTreeSet::new();

    for target in targets {
        let mut patterns = Vec::new();
        for file in &target.files {
            let (root, pattern) = compile_pattern(file)?;
            roots.insert(root);
            patterns.push(pattern);
        }
        compiled.push(CompiledTarget {
            name: target.name.clone(),
            tasks: target.tasks.clone(),
            patterns,
        });
    }

    // Drop roots nested in another watched root
    let all: Vec<PathBuf> = roots.iter().cloned().collect();
    roots.retain(|root| !all.iter().any(|other| other != root && root.starts_with(other)));

    Ok((compiled, roots))
}

fn dispatch(
    event: Event,
    targets: &[CompiledTarget],
    livereload: bool,
    sender: &UnboundedSender<WatchTrigger>,
) {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return;
    }

    for target in targets {
        let paths = target.matching(&event.paths);
        if paths.is_empty() {
            continue;
        }
        debug!("Watch target '{}' matched {:?}", target.name, paths);
        let trigger = WatchTrigger {
            target: target.name.clone(),
            tasks: target.tasks.clone(),
            paths,
            livereload,
        };
        if sender.send(trigger).is_err() {
            debug!("Trigger receiver dropped");
        }
    }
}

/// Start watching every target's files
pub fn watch(targets: &[WatchTarget], livereload: bool) -> Result<WatchHandle, CollaboratorError> {
    let (compiled, roots) = compile_targets(targets)?;
    let names: Vec<String> = compiled.iter().map(|t| t.name.clone()).collect();
    let (sender, receiver) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        match result {
            Ok(event) => dispatch(event, &compiled, livereload, &sender),
            Err(e) => warn!("Watch error: {}", e),
        }
    })
    .map_err(|e| CollaboratorError::Watch(e.to_string()))?;

    for root in &roots {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| CollaboratorError::Watch(format!("{}: {}", root.display(), e)))?;
        debug!("Watching {}", root.display());
    }

    info!("Watching {} targets under {} roots", names.len(), roots.len());
    Ok(WatchHandle {
        names,
        watcher: Some(watcher),
        receiver: Some(receiver),
    })
}

/// An active watcher; stops watching when closed or dropped
pub struct WatchHandle {
    names: Vec<String>,
    watcher: Option<RecommendedWatcher>,
    receiver: Option<UnboundedReceiver<WatchTrigger>>,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("targets", &self.names)
            .field("active", &self.watcher.is_some())
            .finish()
    }
}

impl ResourceHandle for WatchHandle {
    fn kind(&self) -> OperationKind {
        OperationKind::Watch
    }

    fn describe(&self) -> String {
        format!("watcher for [{}]", self.names.join(", "))
    }

    fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    fn take_triggers(&mut self) -> Option<UnboundedReceiver<WatchTrigger>> {
        self.receiver.take()
    }

    fn close(&mut self) {
        self.watcher = None;
    }
}
