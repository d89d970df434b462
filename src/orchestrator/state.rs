//! Pipeline state management and phase tracking
//!
//! - `PipelinePhase`: the linear chain Resolve → Prepare → Compile → Format → Hash → Done
//! - `OrchestrationState`: current phase, timestamps, completed steps, outcome
//!
//! Only forward transitions are legal. `Failed` is reachable from every
//! non-terminal phase and is terminal: there is no recovery transition.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::error::BuildError;
use crate::models::StepKind;

/// Discrete states in the pipeline lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelinePhase {
    /// Repository root and mount sources
    Resolve,

    /// Output directory creation and script checks
    Prepare,

    /// Compiler container writes the artifact
    Compile,

    /// Formatter container rewrites the artifact in place
    Format,

    /// Toolchain container prints the program hash
    Hash,

    /// All steps succeeded
    Done,

    /// A step failed; the run stops here
    Failed,
}

impl PipelinePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Resolve => "resolve",
            PipelinePhase::Prepare => "prepare",
            PipelinePhase::Compile => "compile",
            PipelinePhase::Format => "format",
            PipelinePhase::Hash => "hash",
            PipelinePhase::Done => "done",
            PipelinePhase::Failed => "failed",
        }
    }

    /// All valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> Vec<PipelinePhase> {
        match self {
            PipelinePhase::Resolve => vec![PipelinePhase::Prepare, PipelinePhase::Failed],
            PipelinePhase::Prepare => vec![PipelinePhase::Compile, PipelinePhase::Failed],
            PipelinePhase::Compile => vec![PipelinePhase::Format, PipelinePhase::Failed],
            PipelinePhase::Format => vec![PipelinePhase::Hash, PipelinePhase::Failed],
            PipelinePhase::Hash => vec![PipelinePhase::Done, PipelinePhase::Failed],
            PipelinePhase::Done | PipelinePhase::Failed => vec![],
        }
    }

    pub fn can_transition_to(&self, next: PipelinePhase) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::Done | PipelinePhase::Failed)
    }

    /// Phase in which a given external step runs.
    pub fn for_step(step: StepKind) -> PipelinePhase {
        match step {
            StepKind::Compile => PipelinePhase::Compile,
            StepKind::Format => PipelinePhase::Format,
            StepKind::Hash => PipelinePhase::Hash,
        }
    }
}

/// Execution state snapshot for logging and the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationState {
    pub phase: PipelinePhase,

    /// External steps that exited successfully, in order
    pub completed_steps: Vec<StepKind>,

    /// Hash printed by the hash step
    pub program_hash: Option<String>,

    pub start_time: SystemTime,
    pub last_update_time: SystemTime,

    /// Error message if the run failed
    pub error: Option<String>,
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationState {
    pub fn new() -> Self {
        let now = SystemTime::now();
        OrchestrationState {
            phase: PipelinePhase::Resolve,
            completed_steps: Vec::new(),
            program_hash: None,
            start_time: now,
            last_update_time: now,
            error: None,
        }
    }

    pub fn transition_to(&mut self, next_phase: PipelinePhase) -> Result<(), BuildError> {
        if !self.phase.can_transition_to(next_phase) {
            return Err(BuildError::InvalidTransition(format!(
                "{} -> {}",
                self.phase.as_str(),
                next_phase.as_str()
            )));
        }
        self.phase = next_phase;
        self.last_update_time = SystemTime::now();
        Ok(())
    }

    pub fn record_step(&mut self, step: StepKind) {
        self.completed_steps.push(step);
        self.last_update_time = SystemTime::now();
    }

    /// Record an error and mark the run as failed.
    pub fn record_error(&mut self, error: String) {
        self.error = Some(error);
        self.phase = PipelinePhase::Failed;
        self.last_update_time = SystemTime::now();
    }

    pub fn elapsed_since_start(&self) -> Result<std::time::Duration, std::time::SystemTimeError> {
        self.start_time.elapsed()
    }
}
