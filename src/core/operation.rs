//! Primitive operations - the externally delegated units of work

use crate::core::paths::{PathConfig, TemplateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single primitive operation with its options
///
/// String options may contain path tokens until [`Operation::resolve`] is
/// applied; the task registry only ever stores resolved operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Operation {
    /// Static file server with optional live reload
    Serve {
        #[serde(default = "default_port")]
        port: u16,
        #[serde(default = "default_document_root")]
        root: String,
        #[serde(default = "default_true")]
        livereload: bool,
    },

    /// File watcher that re-runs tasks on change
    Watch {
        targets: Vec<WatchTarget>,
        #[serde(default = "default_true")]
        livereload: bool,
    },

    /// Stylesheet compilation
    CompileStyle {
        input: String,
        output: String,
        #[serde(default)]
        style: StyleOutput,
    },

    /// Script minification
    MinifyScript { input: String, output: String },

    /// In-place markup minification of every matching file under `root`
    MinifyMarkup {
        root: String,
        #[serde(default = "default_markup_pattern")]
        pattern: String,
        #[serde(default)]
        options: MarkupOptions,
    },

    /// Run an external command line and wait for it
    Exec {
        command: String,
        #[serde(default)]
        cwd: Option<String>,
    },

    MakeDirectories { paths: Vec<String> },

    RemovePaths {
        paths: Vec<String>,
        #[serde(default)]
        force: bool,
    },

    CopyTree {
        src: String,
        dest: String,
        #[serde(default = "default_include")]
        include: Vec<String>,
    },

    /// Install front-end packages and lay their main files out by type
    FetchDependencies {
        target_dir: String,
        #[serde(default = "default_true")]
        clean_cache: bool,
    },

    /// Mirror a local tree to a remote FTP directory
    UploadTree {
        local: String,
        host: String,
        #[serde(default = "default_ftp_port")]
        port: u16,
        remote: String,
        auth_key: String,
        #[serde(default)]
        exclusions: Vec<String>,
    },

    OpenBrowser { url: String },
}

/// One group of watched files and the tasks it triggers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchTarget {
    pub name: String,
    pub files: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
}

/// Output style of the stylesheet compiler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleOutput {
    #[default]
    Expanded,
    Compressed,
}

impl StyleOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleOutput::Expanded => "expanded",
            StyleOutput::Compressed => "compressed",
        }
    }
}

/// Markup minifier switches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkupOptions {
    pub collapse_whitespace: bool,
    pub collapse_boolean_attributes: bool,
    pub remove_attribute_quotes: bool,
    pub remove_comments: bool,
}

impl MarkupOptions {
    /// Command-line flags understood by html-minifier
    pub fn cli_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.collapse_whitespace {
            flags.push("--collapse-whitespace");
        }
        if self.collapse_boolean_attributes {
            flags.push("--collapse-boolean-attributes");
        }
        if self.remove_attribute_quotes {
            flags.push("--remove-attribute-quotes");
        }
        if self.remove_comments {
            flags.push("--remove-comments");
        }
        flags
    }
}

fn default_port() -> u16 {
    9001
}

fn default_document_root() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

fn default_markup_pattern() -> String {
    "**/*.html".to_string()
}

fn default_include() -> Vec<String> {
    vec!["**".to_string()]
}

fn default_ftp_port() -> u16 {
    21
}

/// Discriminant of [`Operation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Serve,
    Watch,
    CompileStyle,
    MinifyScript,
    MinifyMarkup,
    Exec,
    MakeDirectories,
    RemovePaths,
    CopyTree,
    FetchDependencies,
    UploadTree,
    OpenBrowser,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Serve => "serve",
            OperationKind::Watch => "watch",
            OperationKind::CompileStyle => "compile-style",
            OperationKind::MinifyScript => "minify-script",
            OperationKind::MinifyMarkup => "minify-markup",
            OperationKind::Exec => "exec",
            OperationKind::MakeDirectories => "make-directories",
            OperationKind::RemovePaths => "remove-paths",
            OperationKind::CopyTree => "copy-tree",
            OperationKind::FetchDependencies => "fetch-dependencies",
            OperationKind::UploadTree => "upload-tree",
            OperationKind::OpenBrowser => "open-browser",
        }
    }

    /// Whether operations of this kind hold a resource open after returning
    pub fn is_long_lived(&self) -> bool {
        matches!(self, OperationKind::Serve | OperationKind::Watch)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Serve { .. } => OperationKind::Serve,
            Operation::Watch { .. } => OperationKind::Watch,
            Operation::CompileStyle { .. } => OperationKind::CompileStyle,
            Operation::MinifyScript { .. } => OperationKind::MinifyScript,
            Operation::MinifyMarkup { .. } => OperationKind::MinifyMarkup,
            Operation::Exec { .. } => OperationKind::Exec,
            Operation::MakeDirectories { .. } => OperationKind::MakeDirectories,
            Operation::RemovePaths { .. } => OperationKind::RemovePaths,
            Operation::CopyTree { .. } => OperationKind::CopyTree,
            Operation::FetchDependencies { .. } => OperationKind::FetchDependencies,
            Operation::UploadTree { .. } => OperationKind::UploadTree,
            Operation::OpenBrowser { .. } => OperationKind::OpenBrowser,
        }
    }

    /// Resolve every path-bearing option against `paths`
    pub fn resolve(&self, paths: &PathConfig) -> Result<Operation, TemplateError> {
        let one = |value: &String| paths.resolve(value);
        let many = |values: &Vec<String>| -> Result<Vec<String>, TemplateError> {
            values.iter().map(|value| paths.resolve(value)).collect()
        };

        Ok(match self {
            Operation::Serve { port, root, livereload } => Operation::Serve {
                port: *port,
                root: one(root)?,
                livereload: *livereload,
            },
            Operation::Watch { targets, livereload } => Operation::Watch {
                targets: targets
                    .iter()
                    .map(|target| {
                        Ok(WatchTarget {
                            name: target.name.clone(),
                            files: many(&target.files)?,
                            tasks: target.tasks.clone(),
                        })
                    })
                    .collect::<Result<_, TemplateError>>()?,
                livereload: *livereload,
            },
            Operation::CompileStyle { input, output, style } => Operation::CompileStyle {
                input: one(input)?,
                output: one(output)?,
                style: *style,
            },
            Operation::MinifyScript { input, output } => Operation::MinifyScript {
                input: one(input)?,
                output: one(output)?,
            },
            Operation::MinifyMarkup { root, pattern, options } => Operation::MinifyMarkup {
                root: one(root)?,
                pattern: one(pattern)?,
                options: options.clone(),
            },
            Operation::Exec { command, cwd } => Operation::Exec {
                command: one(command)?,
                cwd: cwd.as_ref().map(one).transpose()?,
            },
            Operation::MakeDirectories { paths: dirs } => Operation::MakeDirectories {
                paths: many(dirs)?,
            },
            Operation::RemovePaths { paths: targets, force } => Operation::RemovePaths {
                paths: many(targets)?,
                force: *force,
            },
            Operation::CopyTree { src, dest, include } => Operation::CopyTree {
                src: one(src)?,
                dest: one(dest)?,
                include: many(include)?,
            },
            Operation::FetchDependencies { target_dir, clean_cache } => {
                Operation::FetchDependencies {
                    target_dir: one(target_dir)?,
                    clean_cache: *clean_cache,
                }
            }
            Operation::UploadTree {
                local,
                host,
                port,
                remote,
                auth_key,
                exclusions,
            } => Operation::UploadTree {
                local: one(local)?,
                host: one(host)?,
                port: *port,
                remote: one(remote)?,
                auth_key: auth_key.clone(),
                exclusions: many(exclusions)?,
            },
            Operation::OpenBrowser { url } => Operation::OpenBrowser { url: one(url)? },
        })
    }

    /// One-line human readable description
    pub fn summary(&self) -> String {
        match self {
            Operation::Serve { port, root, .. } => format!("serve {} on port {}", root, port),
            Operation::Watch { targets, .. } => {
                let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
                format!("watch [{}]", names.join(", "))
            }
            Operation::CompileStyle { input, output, style } => {
                format!("compile-style {} -> {} ({})", input, output, style.as_str())
            }
            Operation::MinifyScript { input, output } => {
                format!("minify-script {} -> {}", input, output)
            }
            Operation::MinifyMarkup { root, pattern, .. } => {
                format!("minify-markup {}/{}", root.trim_end_matches('/'), pattern)
            }
            Operation::Exec { command, .. } => format!("exec `{}`", command),
            Operation::MakeDirectories { paths } => {
                format!("make-directories ({} paths)", paths.len())
            }
            Operation::RemovePaths { paths, force } => format!(
                "remove-paths ({} paths{})",
                paths.len(),
                if *force { ", forced" } else { "" }
            ),
            Operation::CopyTree { src, dest, .. } => format!("copy-tree {} -> {}", src, dest),
            Operation::FetchDependencies { target_dir, .. } => {
                format!("fetch-dependencies -> {}", target_dir)
            }
            Operation::UploadTree { local, host, remote, .. } => {
                format!("upload-tree {} -> {}:{}", local, host, remote)
            }
            Operation::OpenBrowser { url } => format!("open-browser {}", url),
        }
    }
}
