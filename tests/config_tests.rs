//! Integration tests for the config module
//!
//! Covers the loader (TOML/JSON parsing, saving, repository lookup) and the
//! validator working together on files written to a temporary directory.

use program_builder::config::{loader, validator, HashConfig};
use program_builder::error::ConfigError;
use program_builder::PipelineConfig;
use std::fs;
use std::path::Path;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write config file");
    path
}

// ============================================================================
// CONFIGURATION LOADING TESTS
// ============================================================================

#[test]
fn test_load_partial_toml_keeps_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::TempDir::new()?;
    let path = write(
        tempdir.path(),
        "program-builder.toml",
        r#"
[toolchain]
version = "0.13.2"
"#,
    );

    let config = loader::load_config_from_file(&path)?;
    assert_eq!(config.toolchain.version, "0.13.2");
    assert_eq!(config.toolchain.image, "starknet/cairo-lang");
    assert_eq!(config.formatter, PipelineConfig::default().formatter);
    assert_eq!(config.hash_ref().version, "0.13.2");
    Ok(())
}

#[test]
fn test_load_json_config() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::TempDir::new()?;
    let path = write(
        tempdir.path(),
        "pipeline.json",
        r#"{"engine": "podman", "output_dir": "build/programs", "hash": {"version": "0.12.0"}}"#,
    );

    let config = loader::load_config_from_file(&path)?;
    assert_eq!(config.engine, "podman");
    assert_eq!(config.output_dir, "build/programs");
    assert_eq!(config.hash_ref().to_string(), "starknet/cairo-lang:0.12.0");
    assert_eq!(config.toolchain_ref().to_string(), "starknet/cairo-lang:0.13.3");
    Ok(())
}

#[test]
fn test_load_missing_file() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let result = loader::load_config_from_file(&tempdir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn test_load_malformed_toml() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let path = write(tempdir.path(), "broken.toml", "[toolchain\nversion = ");
    assert!(matches!(
        loader::load_config_from_file(&path),
        Err(ConfigError::InvalidToml(_))
    ));
}

#[test]
fn test_load_malformed_json() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let path = write(tempdir.path(), "broken.json", "{\"engine\": ");
    assert!(matches!(
        loader::load_config_from_file(&path),
        Err(ConfigError::InvalidJson(_))
    ));
}

#[test]
fn test_unsupported_extension_rejected() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let path = write(tempdir.path(), "config.yaml", "engine: docker\n");
    assert!(matches!(
        loader::load_config_from_file(&path),
        Err(ConfigError::ValidationFailed(_))
    ));
}

// ============================================================================
// CONFIGURATION SAVING TESTS
// ============================================================================

#[test]
fn test_save_and_reload_toml() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::TempDir::new()?;
    let path = tempdir.path().join("nested").join("config.toml");

    let mut config = PipelineConfig::default();
    config.formatter.version = "3.3.0".to_string();
    config.hash.image = Some("ghcr.io/acme/cairo-lang".to_string());

    loader::save_config_to_file(&config, &path)?;
    assert!(path.exists());
    assert_eq!(loader::load_config_from_file(&path)?, config);
    Ok(())
}

#[test]
fn test_saved_defaults_omit_hash_overrides() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::TempDir::new()?;
    let path = tempdir.path().join("config.toml");
    loader::save_config_to_file(&PipelineConfig::default(), &path)?;

    let content = fs::read_to_string(&path)?;
    assert!(content.contains("[toolchain]"));
    assert!(!content.contains("[hash]\nimage"));

    let reloaded = loader::load_config_from_file(&path)?;
    assert_eq!(reloaded.hash, HashConfig::default());
    assert_eq!(reloaded.hash_ref(), reloaded.toolchain_ref());
    Ok(())
}

// ============================================================================
// CONFIGURATION VALIDATION TESTS
// ============================================================================

#[test]
fn test_invalid_image_rejected_on_load() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let path = write(
        tempdir.path(),
        "config.toml",
        "[formatter]\nimage = \"Tmknom/Prettier\"\n",
    );
    let err = loader::load_config_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Invalid image name"));
}

#[test]
fn test_escaping_output_dir_rejected_on_load() {
    let tempdir = tempfile::TempDir::new().unwrap();
    let path = write(tempdir.path(), "config.toml", "output_dir = \"../elsewhere\"\n");
    assert!(loader::load_config_from_file(&path).is_err());
}

#[test]
fn test_validator_accepts_registry_with_port() {
    assert!(validator::validate_image("registry.local:5000/starknet/cairo-lang").is_ok());
    assert!(validator::validate_tag("0.13.3-rc.1").is_ok());
    assert!(validator::validate_tag(".hidden").is_err());
}

// ============================================================================
// REPOSITORY LOOKUP
// ============================================================================

#[test]
fn test_effective_config_prefers_repo_file() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROGRAM_BUILDER_CONFIG").is_some() {
        return Ok(());
    }
    let tempdir = tempfile::TempDir::new()?;
    write(
        tempdir.path(),
        loader::REPO_CONFIG_FILE,
        "engine = \"podman\"\n",
    );

    let located = loader::locate_config_file(tempdir.path())?;
    assert_eq!(located, Some(tempdir.path().join(loader::REPO_CONFIG_FILE)));
    assert_eq!(loader::load_effective_config(tempdir.path())?.engine, "podman");
    Ok(())
}
