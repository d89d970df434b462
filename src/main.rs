use anyhow::Context;

use program_builder::config::loader;
use program_builder::{
    BuildError, BuildReport, DockerRunner, LogCollector, Orchestrator, PathRegistry,
    RuntimeOptions,
};

#[tokio::main]
async fn main() {
    // Environment is read exactly once here and passed down explicitly.
    let options = RuntimeOptions::from_env();

    let collector = match LogCollector::new(options.level_filter(), options.log_dir.as_deref()) {
        Ok(collector) => collector,
        Err(e) => {
            eprintln!("[Main] WARNING: file logging unavailable ({}), logging to stderr only", e);
            LogCollector::with_writer(options.level_filter(), Box::new(std::io::stderr()))
        }
    };
    let flusher = collector.clone();
    if let Err(e) = collector.install() {
        eprintln!("[Main] WARNING: Failed to register global logger: {}", e);
    }
    if let Some(path) = flusher.session_log_path() {
        log::debug!("[Main] Session log: {}", path.display());
    }

    let code = match run(&options).await {
        Ok(report) => {
            log::info!(
                "[Main] Built {} in {} ms",
                report.artifact.display(),
                report.elapsed_ms
            );
            0
        }
        Err(err) => {
            log::error!("[Main] {:#}", err);
            exit_code_for(&err)
        }
    };

    let _ = flusher.wait_for_empty();
    std::process::exit(code);
}

async fn run(options: &RuntimeOptions) -> anyhow::Result<BuildReport> {
    let root = PathRegistry::default_root();
    let config = loader::load_effective_config(&root)
        .context("Failed to load pipeline configuration")?;

    if !options.elevation.is_empty() {
        log::info!(
            "[Main] Prefixing every invocation with: {}",
            options.elevation.words().join(" ")
        );
    }
    if options.dry_run {
        log::info!("[Main] Dry run: planned invocations are logged, nothing is executed");
    }

    let runner = DockerRunner::new(config.engine.clone(), options.elevation.clone())
        .dry_run(options.dry_run);
    let mut orchestrator =
        Orchestrator::for_root(&root, config, runner)?.verify_artifact(!options.dry_run);

    let report = orchestrator.run().await?;
    Ok(report)
}

/// First failing container's exit code, 1 for everything else.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<BuildError>()
        .map(BuildError::exit_code)
        .unwrap_or(1)
}
