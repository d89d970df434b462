//! Config file loader and serialization.

use crate::error::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};

use super::{validator, PipelineConfig, ENV_CONFIG};

/// File name looked up at the repository root.
pub const REPO_CONFIG_FILE: &str = "program-builder.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

/// Get the per-user config path: ~/.config/program-builder/config.toml
pub fn get_global_config_path() -> Result<PathBuf, ConfigError> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::ValidationFailed("Cannot determine user config directory".to_string())
    })?;

    Ok(config_dir.join("program-builder").join("config.toml"))
}

/// Pick the configuration file for this run, if any.
///
/// Order: `PROGRAM_BUILDER_CONFIG`, `<root>/program-builder.toml`, the
/// per-user file. An explicit path that does not exist is an error; the two
/// implicit locations are simply skipped.
pub fn locate_config_file(repo_root: &Path) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(explicit) = std::env::var_os(ENV_CONFIG).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(explicit);
        if !path.exists() {
            return Err(ConfigError::FileNotFound(format!(
                "{} points to a missing file: {}",
                ENV_CONFIG,
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    let repo_file = repo_root.join(REPO_CONFIG_FILE);
    if repo_file.is_file() {
        return Ok(Some(repo_file));
    }

    match get_global_config_path() {
        Ok(user_file) if user_file.is_file() => Ok(Some(user_file)),
        _ => Ok(None),
    }
}

/// Load the effective configuration: located file or defaults, validated.
pub fn load_effective_config(repo_root: &Path) -> Result<PipelineConfig, ConfigError> {
    match locate_config_file(repo_root)? {
        Some(path) => {
            log::info!("[Config] Loading pipeline configuration from {}", path.display());
            load_config_from_file(&path)
        }
        None => {
            log::debug!("[Config] No configuration file found, using built-in defaults");
            let config = PipelineConfig::default();
            validator::validate_config(&config)?;
            Ok(config)
        }
    }
}

/// Load and validate config from a `.toml` or `.json` file.
pub fn load_config_from_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let format = validate_config_path(path)?;

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(format!(
                "Configuration file not found at: {}",
                path.display()
            ))
        } else {
            ConfigError::IoError(e)
        }
    })?;

    let config: PipelineConfig = match format {
        ConfigFormat::Toml => toml::from_str(&content)?,
        ConfigFormat::Json => serde_json::from_str(&content)?,
    };

    validator::validate_config(&config)?;
    Ok(config)
}

/// Save config; the format follows the file extension.
pub fn save_config_to_file(config: &PipelineConfig, path: &Path) -> Result<(), ConfigError> {
    let format = validate_config_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(ConfigError::IoError)?;
        }
    }

    let content = match format {
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| {
            ConfigError::ValidationFailed(format!("Failed to serialize TOML: {}", e))
        })?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    };

    fs::write(path, content).map_err(ConfigError::IoError)?;
    Ok(())
}

/// Validate config path (.toml or .json extension required).
fn validate_config_path(path: &Path) -> Result<ConfigFormat, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Configuration path cannot be empty".to_string(),
        ));
    }

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(ConfigFormat::Toml),
        Some("json") => Ok(ConfigFormat::Json),
        Some(ext) => Err(ConfigError::ValidationFailed(format!(
            "Configuration file must have .toml or .json extension, got .{}",
            ext
        ))),
        None => Err(ConfigError::ValidationFailed(
            "Configuration file must have .toml or .json extension".to_string(),
        )),
    }
}
