//! Orchestrator phases: pipeline stages outside the state machine itself.
//!
//! - **Prepare** (`prep`) - output directory and mount-source checks
//! - **Steps** (`steps`) - the compile, format and hash container invocations

pub mod prep;
pub mod steps;

pub use prep::{prepare_output_location, require_artifact};
pub use steps::{compile_invocation, format_invocation, hash_invocation, invocation_for};
