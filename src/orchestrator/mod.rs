//! Build Orchestration: Resolve -> Prepare -> Compile -> Format -> Hash.
//!
//! Strictly sequential and fail-fast: each step is awaited to completion and
//! the first error ends the run with no retry and no cleanup.

pub mod executor;
pub mod phases;
pub mod state;

use std::path::Path;

pub use executor::{build_command_line, display_command_line, CommandRunner, DockerRunner};
pub use state::{OrchestrationState, PipelinePhase};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::log_parsed;
use crate::models::{BuildReport, StepKind};
use crate::system::PathRegistry;

/// Drives one pipeline run over a [`CommandRunner`].
pub struct Orchestrator<R> {
    config: PipelineConfig,
    paths: PathRegistry,
    runner: R,
    state: OrchestrationState,
    /// Check the artifact exists before the format and hash steps
    verify_artifact: bool,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(config: PipelineConfig, paths: PathRegistry, runner: R) -> Self {
        Orchestrator {
            config,
            paths,
            runner,
            state: OrchestrationState::new(),
            verify_artifact: true,
        }
    }

    /// Resolve paths against `repo_root` and build the orchestrator.
    pub fn for_root(repo_root: &Path, config: PipelineConfig, runner: R) -> Result<Self> {
        let paths = PathRegistry::new(repo_root, &config)?;
        Ok(Self::new(config, paths, runner))
    }

    /// Skip the artifact existence check (dry runs produce nothing).
    pub fn verify_artifact(mut self, verify: bool) -> Self {
        self.verify_artifact = verify;
        self
    }

    pub fn state(&self) -> &OrchestrationState {
        &self.state
    }

    pub fn paths(&self) -> &PathRegistry {
        &self.paths
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run every phase. On failure the state is left in `Failed` with the
    /// error text recorded.
    pub async fn run(&mut self) -> Result<BuildReport> {
        match self.run_phases().await {
            Ok(report) => Ok(report),
            Err(err) => {
                log::error!("[Orchestrator] Pipeline aborted in {} phase: {}", self.state.phase.as_str(), err);
                self.state.record_error(err.to_string());
                Err(err)
            }
        }
    }

    async fn run_phases(&mut self) -> Result<BuildReport> {
        log::info!(
            "[Orchestrator] Repository root: {}",
            self.paths.repo_root().display()
        );

        self.transition(PipelinePhase::Prepare)?;
        phases::prepare_output_location(&self.paths)?;

        for step in StepKind::ALL {
            self.transition(PipelinePhase::for_step(step))?;

            if step != StepKind::Compile && self.verify_artifact {
                phases::require_artifact(&self.paths)?;
            }

            let invocation = phases::invocation_for(step, &self.config, &self.paths);
            log_parsed!("STEP {}: {}", step, invocation.tool);
            let output = self.runner.run(&invocation).await?;
            self.state.record_step(step);

            if step == StepKind::Hash {
                self.state.program_hash = output.last_line().map(str::to_string);
            }
        }

        self.transition(PipelinePhase::Done)?;

        if let Some(ref hash) = self.state.program_hash {
            log_parsed!("PROGRAM HASH: {}", hash);
        }

        let elapsed_ms = self
            .state
            .elapsed_since_start()
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Ok(BuildReport {
            artifact: self.paths.artifact().to_path_buf(),
            program_hash: self.state.program_hash.clone(),
            steps: self.state.completed_steps.clone(),
            elapsed_ms,
        })
    }

    fn transition(&mut self, next: PipelinePhase) -> Result<()> {
        self.state.transition_to(next)?;
        log::debug!("[Orchestrator] Phase: {}", next.as_str());
        Ok(())
    }
}
