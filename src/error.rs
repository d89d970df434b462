//! Unified error type hierarchy for Program Builder
//!
//! Provides structured error handling with BuildError and ConfigError.
//! Callers only ever see one failure kind ("an external invocation failed");
//! the variants exist so the log line and the process exit code are right.

use std::io;
use thiserror::Error;

use crate::models::StepKind;

/// Configuration file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in config: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid TOML in config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Build pipeline execution errors.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Preparation phase failed: {0}")]
    PreparationFailed(String),

    #[error("{step} step failed with exit code {code}")]
    InvocationFailed { step: StepKind, code: i32 },

    #[error("{step} step was terminated by a signal")]
    Terminated { step: StepKind },

    #[error("Failed to start {step} step: {reason}")]
    SpawnFailed { step: StepKind, reason: String },

    #[error("Required artifact missing: {0}")]
    ArtifactMissing(String),

    #[error("Invalid phase transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BuildError {
    /// Process exit code for this error.
    ///
    /// A failed container passes its own exit code through; everything the
    /// orchestrator detects itself exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::InvocationFailed { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }

    /// The step that failed, if the error came from an external invocation.
    pub fn step(&self) -> Option<StepKind> {
        match self {
            BuildError::InvocationFailed { step, .. }
            | BuildError::Terminated { step }
            | BuildError::SpawnFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Top-level result type for pipeline operations.
pub type Result<T> = std::result::Result<T, BuildError>;
