//! Stylesheet, script, and markup processing through external tools

use crate::collaborators::{fs, CollaboratorError, ToolCommand};
use crate::core::{MarkupOptions, StyleOutput};
use std::path::Path;
use tracing::info;

fn style_command(program: &str, input: &Path, output: &str, style: StyleOutput) -> ToolCommand {
    ToolCommand::new(program)
        .arg(format!("--style={}", style.as_str()))
        .arg("--no-source-map")
        .arg(input.display().to_string())
        .arg(output)
}

fn script_command(program: &str, input: &Path, output: &str) -> ToolCommand {
    ToolCommand::new(program)
        .arg(input.display().to_string())
        .arg("-o")
        .arg(output)
}

/// Compile one stylesheet
///
/// `input` may be a glob but must match exactly one file.
pub async fn compile_style(
    program: &str,
    input: &str,
    output: &str,
    style: StyleOutput,
) -> Result<(), CollaboratorError> {
    let input = fs::resolve_single_input(input)?;
    fs::ensure_parent(Path::new(output))?;

    style_command(program, &input, output, style).run().await?;
    info!("Compiled {} -> {}", input.display(), output);
    Ok(())
}

/// Minify one script
pub async fn minify_script(program: &str, input: &str, output: &str) -> Result<(), CollaboratorError> {
    let input = fs::resolve_single_input(input)?;
    fs::ensure_parent(Path::new(output))?;

    script_command(program, &input, output).run().await?;
    info!("Minified {} -> {}", input.display(), output);
    Ok(())
}

/// Minify every file under `root` matching `pattern`, in place
///
/// The minifier is run once per file and its stdout replaces the file.
pub async fn minify_markup(
    program: &str,
    root: &str,
    pattern: &str,
    options: &MarkupOptions,
) -> Result<usize, CollaboratorError> {
    let files = fs::matching_files(Path::new(root), &[pattern.to_string()])?;

    for file in &files {
        let minified = ToolCommand::new(program)
            .args(options.cli_flags())
            .arg(file.display().to_string())
            .output()
            .await?;
        tokio::fs::write(file, minified)
            .await
            .map_err(CollaboratorError::io(file))?;
    }

    info!("Minified {} markup files under {}", files.len(), root);
    Ok(files.len())
}
