//! Prepare phase: output directory setup and mount-source checks.
//!
//! Runs before any container starts, so a broken checkout fails here with a
//! readable message instead of as an opaque engine error in the middle of
//! the pipeline.

use std::path::Path;

use crate::error::BuildError;
use crate::system::PathRegistry;

/// Creates the output directory and verifies everything later mounted.
///
/// 1. `create_dir_all` on the output directory (idempotent)
/// 2. both entrypoint scripts exist and are regular files
/// 3. no mount source contains a `:` (the `-v` separator)
pub fn prepare_output_location(paths: &PathRegistry) -> Result<(), BuildError> {
    let output_dir = paths.output_dir();

    if output_dir.exists() && !output_dir.is_dir() {
        return Err(BuildError::PreparationFailed(format!(
            "Output path exists but is not a directory: {}",
            output_dir.display()
        )));
    }

    std::fs::create_dir_all(output_dir).map_err(|e| {
        BuildError::PreparationFailed(format!(
            "Failed to create output directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;
    log::debug!("[Prepare] Output directory ready: {}", output_dir.display());

    require_file(&paths.compile_script(), "compile entrypoint")?;
    require_file(&paths.hash_script(), "hash entrypoint")?;

    for source in paths.mount_sources() {
        validate_mount_source(&source)?;
    }

    Ok(())
}

fn require_file(path: &Path, what: &str) -> Result<(), BuildError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(BuildError::PreparationFailed(format!(
            "Missing {} script: {}",
            what,
            path.display()
        )))
    }
}

/// Bind-mount sources must not contain the `-v` field separator.
pub fn validate_mount_source(path: &Path) -> Result<(), BuildError> {
    let shown = path.to_string_lossy();
    if shown.contains(':') {
        return Err(BuildError::PreparationFailed(format!(
            "Path cannot be bind-mounted because it contains ':': {}",
            shown
        )));
    }
    Ok(())
}

/// Called once the artifact should exist (after compile, before format and hash).
pub fn require_artifact(paths: &PathRegistry) -> Result<(), BuildError> {
    let artifact = paths.artifact();
    if artifact.is_file() {
        Ok(())
    } else {
        Err(BuildError::ArtifactMissing(artifact.display().to_string()))
    }
}
