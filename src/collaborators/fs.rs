//! Native filesystem operations: scaffolding, removal, tree copies, and
//! glob expansion shared by the other collaborators

use crate::collaborators::CollaboratorError;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

/// Whether `s` contains glob metacharacters
pub fn contains_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '[', ']'])
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, CollaboratorError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| CollaboratorError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Expand a literal path or glob into the paths it names
///
/// Literal paths are returned as-is whether or not they exist.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, CollaboratorError> {
    if !contains_glob_chars(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let entries = glob::glob(pattern).map_err(|e| CollaboratorError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    entries
        .map(|entry| {
            entry.map_err(|e| {
                let path = e.path().to_path_buf();
                CollaboratorError::Io {
                    path,
                    source: e.into(),
                }
            })
        })
        .collect()
}

/// Resolve a literal path or glob to exactly one existing file
pub fn resolve_single_input(pattern: &str) -> Result<PathBuf, CollaboratorError> {
    let matches: Vec<PathBuf> = expand_pattern(pattern)?
        .into_iter()
        .filter(|path| path.is_file())
        .collect();

    match matches.len() {
        0 => Err(CollaboratorError::MissingInput(pattern.to_string())),
        1 => Ok(matches.into_iter().next().unwrap_or_default()),
        count => Err(CollaboratorError::AmbiguousInput {
            pattern: pattern.to_string(),
            count,
        }),
    }
}

/// Create the parent directory of `path` if needed
pub fn ensure_parent(path: &Path) -> Result<(), CollaboratorError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(CollaboratorError::io(parent))
        }
        _ => Ok(()),
    }
}

/// Create every directory in `paths`, including parents
pub fn make_directories(paths: &[String]) -> Result<usize, CollaboratorError> {
    for path in paths {
        fs::create_dir_all(path).map_err(CollaboratorError::io(path))?;
        debug!("Created directory {}", path);
    }
    info!("Created {} directories", paths.len());
    Ok(paths.len())
}

/// Remove files and directories named by `paths` (globs allowed)
///
/// Without `force`, only paths strictly inside the working directory may
/// be removed. Missing paths are skipped.
pub fn remove_paths(paths: &[String], force: bool) -> Result<usize, CollaboratorError> {
    let cwd = std::env::current_dir().map_err(CollaboratorError::io("."))?;
    remove_paths_within(paths, force, &cwd)
}

fn remove_paths_within(
    paths: &[String],
    force: bool,
    base: &Path,
) -> Result<usize, CollaboratorError> {
    let base = base.canonicalize().map_err(CollaboratorError::io(base))?;
    let mut removed = 0;

    for pattern in paths {
        for path in expand_pattern(pattern)? {
            let Ok(metadata) = fs::symlink_metadata(&path) else {
                debug!("Nothing to remove at {}", path.display());
                continue;
            };

            if !force {
                let target = path.canonicalize().map_err(CollaboratorError::io(&path))?;
                if target == base || !target.starts_with(&base) {
                    return Err(CollaboratorError::Refused(path));
                }
            }

            if metadata.is_dir() {
                fs::remove_dir_all(&path).map_err(CollaboratorError::io(&path))?;
            } else {
                fs::remove_file(&path).map_err(CollaboratorError::io(&path))?;
            }
            debug!("Removed {}", path.display());
            removed += 1;
        }
    }

    info!("Removed {} paths", removed);
    Ok(removed)
}

/// Files under `root` whose root-relative path matches any of `patterns`
pub fn matching_files(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>, CollaboratorError> {
    let patterns = compile_patterns(patterns)?;
    if !root.is_dir() {
        return Err(CollaboratorError::MissingInput(root.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            CollaboratorError::Io {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| CollaboratorError::Internal(e.to_string()))?;
        if patterns
            .iter()
            .any(|pattern| pattern.matches_path_with(relative, MATCH_OPTIONS))
        {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

/// Copy every file under `src` matching `include` to the same relative
/// location under `dest`
pub fn copy_tree(src: &Path, dest: &Path, include: &[String]) -> Result<usize, CollaboratorError> {
    let files = matching_files(src, include)?;

    for file in &files {
        let relative = file
            .strip_prefix(src)
            .map_err(|e| CollaboratorError::Internal(e.to_string()))?;
        let target = dest.join(relative);
        ensure_parent(&target)?;
        fs::copy(file, &target).map_err(CollaboratorError::io(file))?;
    }

    info!("Copied {} files from {} to {}", files.len(), src.display(), dest.display());
    Ok(files.len())
}
