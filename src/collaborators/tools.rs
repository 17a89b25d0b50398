//! External tool configuration

use serde::{Deserialize, Serialize};

/// Executables used for the delegated operations
///
/// Each entry is a program name looked up on PATH or an absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Stylesheet compiler (dart-sass command line)
    pub sass: String,

    /// Script minifier
    pub uglifyjs: String,

    /// Markup minifier
    pub html_minifier: String,

    /// Front-end package manager
    pub bower: String,

    /// FTP client used for uploads
    pub lftp: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            sass: "sass".to_string(),
            uglifyjs: "uglifyjs".to_string(),
            html_minifier: "html-minifier".to_string(),
            bower: "bower".to_string(),
            lftp: "lftp".to_string(),
        }
    }
}
