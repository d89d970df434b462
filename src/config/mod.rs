//! Configuration module for the build pipeline.
//!
//! # Module Structure
//!
//! - `loader`: locating, reading and writing pipeline configuration files
//! - `validator`: image reference and layout checks
//!
//! # Configuration Flow
//!
//! 1. `loader::locate_config_file` picks the file (env override, repo file, user file)
//! 2. `loader::load_config_from_file` parses `.toml` or `.json`
//! 3. `validator::validate_config` rejects malformed references and layouts
//! 4. `RuntimeOptions::from_env` adds the process-wide switches (`SUDO`, dry run, logging)

pub mod loader;
pub mod validator;

use serde::{Deserialize, Serialize};

use crate::models::{Elevation, ToolRef};

pub const DEFAULT_ENGINE: &str = "docker";
pub const DEFAULT_ARTIFACT: &str = "layout_bridge.json";
pub const DEFAULT_OUTPUT_DIR: &str = "programs";
pub const DEFAULT_SCRIPTS_DIR: &str = "scripts";
pub const DEFAULT_TOOLCHAIN_IMAGE: &str = "starknet/cairo-lang";
pub const DEFAULT_TOOLCHAIN_VERSION: &str = "0.13.3";
pub const DEFAULT_VERSION_ENV: &str = "CAIRO_VERSION";
pub const DEFAULT_FORMATTER_IMAGE: &str = "tmknom/prettier";
pub const DEFAULT_FORMATTER_VERSION: &str = "3.2.5";

pub const ENV_CONFIG: &str = "PROGRAM_BUILDER_CONFIG";
pub const ENV_ROOT: &str = "PROGRAM_BUILDER_ROOT";
pub const ENV_DRY_RUN: &str = "PROGRAM_BUILDER_DRY_RUN";
pub const ENV_LOG: &str = "PROGRAM_BUILDER_LOG";
pub const ENV_LOG_DIR: &str = "PROGRAM_BUILDER_LOG_DIR";

/// Compiler toolchain image, used by both the compile and the hash step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    pub image: String,
    pub version: String,
    /// Environment variable carrying the version into the compile container.
    pub version_env: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        ToolchainConfig {
            image: DEFAULT_TOOLCHAIN_IMAGE.to_string(),
            version: DEFAULT_TOOLCHAIN_VERSION.to_string(),
            version_env: DEFAULT_VERSION_ENV.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    pub image: String,
    pub version: String,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        FormatterConfig {
            image: DEFAULT_FORMATTER_IMAGE.to_string(),
            version: DEFAULT_FORMATTER_VERSION.to_string(),
        }
    }
}

/// Hash step overrides. Unset fields fall back to the toolchain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Pipeline configuration as read from disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Container engine binary.
    pub engine: String,
    /// Artifact file name inside the output directory.
    pub artifact: String,
    /// Output directory, relative to the repository root.
    pub output_dir: String,
    /// Entrypoint scripts directory, relative to the repository root.
    pub scripts_dir: String,
    pub toolchain: ToolchainConfig,
    pub formatter: FormatterConfig,
    pub hash: HashConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            engine: DEFAULT_ENGINE.to_string(),
            artifact: DEFAULT_ARTIFACT.to_string(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            scripts_dir: DEFAULT_SCRIPTS_DIR.to_string(),
            toolchain: ToolchainConfig::default(),
            formatter: FormatterConfig::default(),
            hash: HashConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn toolchain_ref(&self) -> ToolRef {
        ToolRef::new(&self.toolchain.image, &self.toolchain.version)
    }

    pub fn formatter_ref(&self) -> ToolRef {
        ToolRef::new(&self.formatter.image, &self.formatter.version)
    }

    /// Image used by the hash step: the toolchain reference unless overridden.
    pub fn hash_ref(&self) -> ToolRef {
        let toolchain = self.toolchain_ref();
        ToolRef {
            image: self.hash.image.clone().unwrap_or(toolchain.image),
            version: self.hash.version.clone().unwrap_or(toolchain.version),
        }
    }
}

/// Process-wide switches, read once at startup and passed down explicitly.
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    pub elevation: Elevation,
    pub dry_run: bool,
    pub log_level: Option<String>,
    pub log_dir: Option<std::path::PathBuf>,
}

impl RuntimeOptions {
    pub fn from_env() -> Self {
        RuntimeOptions {
            elevation: Elevation::from_env(),
            dry_run: env_flag(ENV_DRY_RUN),
            log_level: std::env::var(ENV_LOG).ok().filter(|v| !v.trim().is_empty()),
            log_dir: std::env::var_os(ENV_LOG_DIR)
                .filter(|v| !v.is_empty())
                .map(std::path::PathBuf::from),
        }
    }

    /// Level filter for the logger; unknown values fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level
            .as_deref()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(log::LevelFilter::Info)
    }
}

/// `1`, `true`, `yes` and `on` (any case) enable a flag; anything else does not.
fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
