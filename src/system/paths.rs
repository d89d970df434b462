//! Centralized Path Registry: repository-root anchoring
//!
//! Every host path handed to a container is resolved here, relative to the
//! repository root and never relative to the caller's working directory.
//! The root comes from `PROGRAM_BUILDER_ROOT` when set, otherwise from the
//! checkout the executable lives in (see [`PathRegistry::default_root`]).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::loader::REPO_CONFIG_FILE;
use crate::config::{PipelineConfig, DEFAULT_SCRIPTS_DIR, ENV_ROOT};
use crate::error::BuildError;

/// Entrypoint script for the compile step, relative to the scripts directory.
pub const COMPILE_SCRIPT: &str = "compile_layout_bridge.sh";

/// Companion script for the hash step, relative to the scripts directory.
pub const HASH_SCRIPT: &str = "compute_program_hash.sh";

/// Resolved, absolute locations used by one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathRegistry {
    /// Canonical repository root
    repo_root: PathBuf,

    /// Directory holding the entrypoint scripts
    scripts_dir: PathBuf,

    /// Shared output directory mounted into every step
    output_dir: PathBuf,

    /// Artifact file inside the output directory
    artifact: PathBuf,
}

impl PathRegistry {
    /// Resolve the repository root.
    ///
    /// 1. `PROGRAM_BUILDER_ROOT`, when set and non-empty
    /// 2. the nearest ancestor of the running executable that looks like a
    ///    checkout (`target/release/program_builder` lands on the repository)
    /// 3. the manifest directory recorded at compile time
    pub fn default_root() -> PathBuf {
        root_from(std::env::var_os(ENV_ROOT), std::env::current_exe().ok())
    }

    /// Build the registry for `repo_root`.
    ///
    /// The root must exist: it is canonicalized so that mount sources are
    /// absolute (the engine rejects relative bind-mount sources).
    pub fn new(repo_root: &Path, config: &PipelineConfig) -> Result<Self, BuildError> {
        let repo_root = repo_root.canonicalize().map_err(|e| {
            BuildError::PreparationFailed(format!(
                "Failed to resolve repository root {}: {}",
                repo_root.display(),
                e
            ))
        })?;

        let scripts_dir = repo_root.join(&config.scripts_dir);
        let output_dir = repo_root.join(&config.output_dir);
        let artifact = output_dir.join(&config.artifact);

        log::debug!("[PathRegistry] Repository root: {}", repo_root.display());
        log::debug!("[PathRegistry] Output directory: {}", output_dir.display());

        Ok(PathRegistry {
            repo_root,
            scripts_dir,
            output_dir,
            artifact,
        })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    pub fn compile_script(&self) -> PathBuf {
        self.scripts_dir.join(COMPILE_SCRIPT)
    }

    pub fn hash_script(&self) -> PathBuf {
        self.scripts_dir.join(HASH_SCRIPT)
    }

    /// Paths that become bind-mount sources.
    pub fn mount_sources(&self) -> Vec<PathBuf> {
        vec![
            self.output_dir.clone(),
            self.compile_script(),
            self.hash_script(),
            self.artifact.clone(),
        ]
    }
}

fn root_from(env_root: Option<OsString>, exe: Option<PathBuf>) -> PathBuf {
    if let Some(root) = env_root.filter(|v| !v.is_empty()) {
        return PathBuf::from(root);
    }
    exe.as_deref()
        .and_then(Path::parent)
        .and_then(|dir| dir.ancestors().find(|a| looks_like_checkout(a)))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")))
}

/// A repository root carries the compile entrypoint or a repo config file.
fn looks_like_checkout(dir: &Path) -> bool {
    dir.join(DEFAULT_SCRIPTS_DIR).join(COMPILE_SCRIPT).is_file()
        || dir.join(REPO_CONFIG_FILE).is_file()
}
