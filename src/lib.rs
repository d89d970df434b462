//! Program Builder
//!
//! Builds the layout bridge program deterministically inside pinned
//! containers, formats its JSON in place and prints its program hash.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Tool references, mounts, invocations and reports
//! - **config**: Pipeline configuration loading and validation
//! - **system**: Repository-root path resolution and logging macros
//! - **log_collector**: `log` backend writing to stderr and an optional session file
//! - **orchestrator**: Phase state machine, step invocations and the container runner

// Core foundational modules
pub mod error;
pub mod models;

// Configuration management module
pub mod config;

// Path resolution and logging macros
pub mod system;

// Decoupled logging pipeline
pub mod log_collector;

// Build orchestration and state management
pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{BuildError, ConfigError, Result};

pub use models::{
    BuildReport, Elevation, Invocation, Mount, StepKind, StepOutput, ToolRef,
};

pub use config::{PipelineConfig, RuntimeOptions};

pub use log_collector::{LogCollector, LogLine};

pub use system::PathRegistry;

pub use orchestrator::{
    CommandRunner, DockerRunner, OrchestrationState, Orchestrator, PipelinePhase,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_reexports() {
        let _: Result<i32> = Ok(42);
        assert_eq!(StepKind::Compile.as_str(), "compile");
        assert_eq!(PipelinePhase::Resolve.as_str(), "resolve");
    }
}
