//! Container invocations for the compile, format and hash steps.

use crate::config::PipelineConfig;
use crate::models::{Invocation, Mount, StepKind};
use crate::system::PathRegistry;

/// Output directory mount point inside the compiler container.
pub const COMPILE_OUTPUT_MOUNT: &str = "/output";
pub const COMPILE_ENTRYPOINT: &str = "/compile.sh";

/// Output directory mount point (and working directory) inside the formatter.
pub const FORMAT_WORKDIR: &str = "/work";

/// Fixed in-container path of the artifact during hashing.
pub const HASH_PROGRAM_MOUNT: &str = "/program.json";
pub const HASH_ENTRYPOINT: &str = "/hash.sh";

/// Compiler toolchain writes the artifact into the output directory.
pub fn compile_invocation(config: &PipelineConfig, paths: &PathRegistry) -> Invocation {
    Invocation::new(StepKind::Compile, config.toolchain_ref())
        .mount(Mount::read_write(paths.output_dir(), COMPILE_OUTPUT_MOUNT))
        .mount(Mount::read_only(paths.compile_script(), COMPILE_ENTRYPOINT))
        .env(&config.toolchain.version_env, &config.toolchain.version)
        .entrypoint(COMPILE_ENTRYPOINT)
}

/// Formatter rewrites the artifact in place, as root so it can overwrite a
/// file owned by the compiler container's user.
pub fn format_invocation(config: &PipelineConfig, paths: &PathRegistry) -> Invocation {
    Invocation::new(StepKind::Format, config.formatter_ref())
        .user("root")
        .mount(Mount::read_write(paths.output_dir(), FORMAT_WORKDIR))
        .workdir(FORMAT_WORKDIR)
        .arg("--write")
        .arg(&config.artifact)
}

/// Toolchain image again, artifact mounted read-only, companion script prints the hash.
pub fn hash_invocation(config: &PipelineConfig, paths: &PathRegistry) -> Invocation {
    Invocation::new(StepKind::Hash, config.hash_ref())
        .mount(Mount::read_only(paths.artifact(), HASH_PROGRAM_MOUNT))
        .mount(Mount::read_only(paths.hash_script(), HASH_ENTRYPOINT))
        .entrypoint(HASH_ENTRYPOINT)
}

/// Invocation for `step`.
pub fn invocation_for(step: StepKind, config: &PipelineConfig, paths: &PathRegistry) -> Invocation {
    match step {
        StepKind::Compile => compile_invocation(config, paths),
        StepKind::Format => format_invocation(config, paths),
        StepKind::Hash => hash_invocation(config, paths),
    }
}
