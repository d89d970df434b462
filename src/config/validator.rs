//! Pipeline configuration validation.
//!
//! Values end up as separate process arguments, never inside a shell string,
//! but a malformed image reference or a path that escapes the repository
//! still produces a confusing engine error. Reject them up front.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path};

use super::PipelineConfig;
use crate::error::ConfigError;

/// `[registry[:port]/]name[/name...]`, lowercase.
static IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]+([._-][a-z0-9]+)*(:[0-9]+)?(/[a-z0-9]+([._-][a-z0-9]+)*)*$")
        .expect("image regex is valid")
});

/// Tag grammar: up to 128 word characters, dots and dashes, not starting with either.
static TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("tag regex is valid"));

static ENV_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("env regex is valid"));

pub fn validate_image(image: &str) -> Result<(), ConfigError> {
    if IMAGE_RE.is_match(image) {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(format!(
            "Invalid image name: {:?}",
            image
        )))
    }
}

pub fn validate_tag(tag: &str) -> Result<(), ConfigError> {
    if TAG_RE.is_match(tag) {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(format!(
            "Invalid version tag: {:?}",
            tag
        )))
    }
}

/// Artifact must be a bare file name so it stays inside the output directory.
pub fn validate_artifact_name(name: &str) -> Result<(), ConfigError> {
    let path = Path::new(name);
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ConfigError::ValidationFailed(format!(
            "Artifact must be a plain file name, got {:?}",
            name
        ))),
    }
}

/// Relative, non-empty, no `..`.
pub fn validate_relative_dir(field: &str, dir: &str) -> Result<(), ConfigError> {
    if dir.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(format!(
            "{} cannot be empty",
            field
        )));
    }
    let path = Path::new(dir);
    if path.is_absolute() {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must be relative to the repository root, got {}",
            field, dir
        )));
    }
    if path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(ConfigError::ValidationFailed(format!(
            "{} must stay inside the repository root, got {}",
            field, dir
        )));
    }
    Ok(())
}

pub fn validate_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.engine.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "Container engine cannot be empty".to_string(),
        ));
    }

    validate_image(&config.toolchain.image)?;
    validate_tag(&config.toolchain.version)?;
    validate_image(&config.formatter.image)?;
    validate_tag(&config.formatter.version)?;
    if let Some(ref image) = config.hash.image {
        validate_image(image)?;
    }
    if let Some(ref version) = config.hash.version {
        validate_tag(version)?;
    }

    if !ENV_NAME_RE.is_match(&config.toolchain.version_env) {
        return Err(ConfigError::ValidationFailed(format!(
            "Invalid version environment variable name: {:?}",
            config.toolchain.version_env
        )));
    }

    validate_artifact_name(&config.artifact)?;
    validate_relative_dir("output_dir", &config.output_dir)?;
    validate_relative_dir("scripts_dir", &config.scripts_dir)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&PipelineConfig::default()).is_ok());
    }

    #[test]
    fn test_image_names() {
        assert!(validate_image("starknet/cairo-lang").is_ok());
        assert!(validate_image("ghcr.io/org/tool").is_ok());
        assert!(validate_image("localhost:5000/tool").is_ok());
        assert!(validate_image("Upper/Case").is_err());
        assert!(validate_image("bad image").is_err());
        assert!(validate_image("").is_err());
    }

    #[test]
    fn test_tags() {
        assert!(validate_tag("0.13.3").is_ok());
        assert!(validate_tag("v2.10.0-rc.1").is_ok());
        assert!(validate_tag("latest").is_ok());
        assert!(validate_tag(".hidden").is_err());
        assert!(validate_tag("a:b").is_err());
        assert!(validate_tag("").is_err());
    }

    #[test]
    fn test_artifact_name() {
        assert!(validate_artifact_name("layout_bridge.json").is_ok());
        assert!(validate_artifact_name("../escape.json").is_err());
        assert!(validate_artifact_name("nested/file.json").is_err());
        assert!(validate_artifact_name("/abs.json").is_err());
    }

    #[test]
    fn test_relative_dir() {
        assert!(validate_relative_dir("output_dir", "programs").is_ok());
        assert!(validate_relative_dir("output_dir", "build/programs").is_ok());
        assert!(validate_relative_dir("output_dir", "").is_err());
        assert!(validate_relative_dir("output_dir", "/tmp").is_err());
        assert!(validate_relative_dir("output_dir", "../out").is_err());
    }

    #[test]
    fn test_bad_version_env() {
        let mut config = PipelineConfig::default();
        config.toolchain.version_env = "1BAD".to_string();
        assert!(validate_config(&config).is_err());
    }
}
