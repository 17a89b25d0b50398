//! FTP mirroring of a built site through lftp

use crate::collaborators::{CollaboratorError, ToolCommand};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File holding `{ "<key>": { "username": ..., "password": ... } }`
pub const CREDENTIALS_FILE: &str = ".ftppass";

/// A resolved upload-tree operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub local: String,
    pub host: String,
    pub port: u16,
    pub remote: String,
    pub auth_key: String,
    pub exclusions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn credential_files() -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        files.push(cwd.join(CREDENTIALS_FILE));
    }
    if let Some(home) = dirs::home_dir() {
        files.push(home.join(CREDENTIALS_FILE));
    }
    files
}

/// Look `key` up in the first credentials file that exists
pub fn load_credentials(candidates: &[PathBuf], key: &str) -> Result<Credentials, CollaboratorError> {
    let Some(path) = candidates.iter().find(|path| path.is_file()) else {
        return Err(CollaboratorError::Credentials(format!(
            "no {} file found",
            CREDENTIALS_FILE
        )));
    };

    let content = std::fs::read_to_string(path).map_err(CollaboratorError::io(path))?;
    let mut entries: HashMap<String, Credentials> = serde_json::from_str(&content)
        .map_err(|e| CollaboratorError::Credentials(format!("{}: {}", path.display(), e)))?;

    entries.remove(key).ok_or_else(|| {
        CollaboratorError::Credentials(format!("key '{}' not found in {}", key, path.display()))
    })
}

fn quote(value: &str) -> Result<String, CollaboratorError> {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| CollaboratorError::InvalidCommand(format!("{}: {}", value, e)))
}

/// Exclusions match by final path component, so `site/**/.DS_Store`
/// excludes every `.DS_Store`
fn exclusion_glob(exclusion: &str) -> &str {
    Path::new(exclusion)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(exclusion)
}

fn mirror_script(request: &UploadRequest) -> Result<String, CollaboratorError> {
    let mut parts = vec!["mirror -R".to_string()];
    for exclusion in &request.exclusions {
        parts.push(format!("--exclude-glob {}", quote(exclusion_glob(exclusion))?));
    }
    parts.push(quote(&request.local)?);
    parts.push(quote(&request.remote)?);
    Ok(format!("{}; quit", parts.join(" ")))
}

fn upload_command(
    program: &str,
    request: &UploadRequest,
    credentials: &Credentials,
) -> Result<ToolCommand, CollaboratorError> {
    Ok(ToolCommand::new(program)
        .arg("-p")
        .arg(request.port.to_string())
        .arg("-u")
        .arg(credentials.username.clone())
        .arg("--env-password")
        .arg("-e")
        .arg(mirror_script(request)?)
        .arg(request.host.clone())
        .env("LFTP_PASSWORD", credentials.password.clone()))
}

/// Mirror `request.local` to `request.remote` on the FTP host
pub async fn upload_tree(program: &str, request: &UploadRequest) -> Result<(), CollaboratorError> {
    if request.host.trim().is_empty() {
        return Err(CollaboratorError::Credentials(
            "FTP host is empty; set it with --set ftpHost=<host>".to_string(),
        ));
    }
    if !Path::new(&request.local).is_dir() {
        return Err(CollaboratorError::MissingInput(request.local.clone()));
    }

    let credentials = load_credentials(&credential_files(), &request.auth_key)?;
    let command = upload_command(program, request, &credentials)?;
    debug!("Uploading with `{}`", command.display());

    command.run().await?;
    info!(
        "Uploaded {} to {}:{}",
        request.local, request.host, request.remote
    );
    Ok(())
}
