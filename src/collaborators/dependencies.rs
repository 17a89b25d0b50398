//! Front-end package installation
//!
//! Packages are installed with bower, then each package's declared main
//! files are copied into `<target>/<extension>/<package>/`.

use crate::collaborators::{blocking, fs, CollaboratorError, ToolCommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DEFAULT_COMPONENTS_DIR: &str = "bower_components";
const MANIFEST_FILES: [&str; 2] = ["bower.json", ".bower.json"];

#[derive(Debug, Default, Deserialize)]
struct BowerRc {
    directory: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MainFiles {
    One(String),
    Many(Vec<String>),
}

impl Default for MainFiles {
    fn default() -> Self {
        MainFiles::Many(Vec::new())
    }
}

impl MainFiles {
    fn into_vec(self) -> Vec<String> {
        match self {
            MainFiles::One(file) => vec![file],
            MainFiles::Many(files) => files,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    main: MainFiles,
}

/// Directory bower installs into, honouring `.bowerrc` in `base`
pub fn components_dir(base: &Path) -> Result<PathBuf, CollaboratorError> {
    let rc_path = base.join(".bowerrc");
    if !rc_path.is_file() {
        return Ok(base.join(DEFAULT_COMPONENTS_DIR));
    }

    let content = std::fs::read_to_string(&rc_path).map_err(CollaboratorError::io(&rc_path))?;
    let rc: BowerRc = serde_json::from_str(&content)
        .map_err(|e| CollaboratorError::Manifest(format!("{}: {}", rc_path.display(), e)))?;

    Ok(base.join(rc.directory.as_deref().unwrap_or(DEFAULT_COMPONENTS_DIR)))
}

fn read_manifest(package_dir: &Path) -> Result<Option<PackageManifest>, CollaboratorError> {
    for name in MANIFEST_FILES {
        let path = package_dir.join(name);
        if !path.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&path).map_err(CollaboratorError::io(&path))?;
        let manifest = serde_json::from_str(&content)
            .map_err(|e| CollaboratorError::Manifest(format!("{}: {}", path.display(), e)))?;
        return Ok(Some(manifest));
    }
    Ok(None)
}

fn main_file_paths(package_dir: &Path, main: &str) -> Result<Vec<PathBuf>, CollaboratorError> {
    let relative = main.trim_start_matches("./");
    let joined = package_dir.join(relative);
    if fs::contains_glob_chars(relative) {
        fs::expand_pattern(&joined.display().to_string())
    } else {
        Ok(vec![joined])
    }
}

/// Copy the main files of every installed package into `target`, grouped
/// by file extension
pub fn install_by_type(components: &Path, target: &Path) -> Result<usize, CollaboratorError> {
    if !components.is_dir() {
        return Err(CollaboratorError::Manifest(format!(
            "components directory {} does not exist",
            components.display()
        )));
    }

    let mut packages: Vec<PathBuf> = std::fs::read_dir(components)
        .map_err(CollaboratorError::io(components))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    packages.sort();

    let mut copied = 0;
    for package_dir in packages {
        let package = package_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(manifest) = read_manifest(&package_dir)? else {
            warn!("Package {} has no manifest, skipping", package);
            continue;
        };

        for main in manifest.main.into_vec() {
            for file in main_file_paths(&package_dir, &main)? {
                if !file.is_file() {
                    warn!("Main file {} of {} not found", main, package);
                    continue;
                }
                let extension = file
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "other".to_string());
                let Some(file_name) = file.file_name() else {
                    continue;
                };

                let dest = target.join(&extension).join(&package).join(file_name);
                fs::ensure_parent(&dest)?;
                std::fs::copy(&file, &dest).map_err(CollaboratorError::io(&file))?;
                debug!("Installed {} -> {}", file.display(), dest.display());
                copied += 1;
            }
        }
    }

    Ok(copied)
}

/// Install packages and lay their main files out under `target_dir`
pub async fn fetch_dependencies(
    program: &str,
    target_dir: &str,
    clean_cache: bool,
) -> Result<usize, CollaboratorError> {
    let cwd = std::env::current_dir().map_err(CollaboratorError::io("."))?;
    fetch_dependencies_in(program, &cwd, target_dir, clean_cache).await
}

/// [`fetch_dependencies`] for a project rooted at `base`
async fn fetch_dependencies_in(
    program: &str,
    base: &Path,
    target_dir: &str,
    clean_cache: bool,
) -> Result<usize, CollaboratorError> {
    ToolCommand::new(program)
        .arg("install")
        .current_dir(base)
        .run()
        .await?;

    let base = base.to_path_buf();
    let target = base.join(target_dir);
    let copied = blocking(move || {
        let components = components_dir(&base)?;
        let copied = install_by_type(&components, &target)?;
        info!("Installed {} dependency files into {}", copied, target.display());

        if clean_cache {
            std::fs::remove_dir_all(&components).map_err(CollaboratorError::io(&components))?;
            debug!("Removed {}", components.display());
        }
        Ok(copied)
    })
    .await?;

    Ok(copied)
}
