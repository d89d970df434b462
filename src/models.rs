//! Core data structures for the build pipeline.
//!
//! Everything here is plain data: tool references, bind mounts, container
//! invocations and their outcome. Rendering an [`Invocation`] into engine
//! arguments is pure, so the exact command line can be tested without an
//! engine installed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The three external steps of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Compile,
    Format,
    Hash,
}

impl StepKind {
    pub const ALL: [StepKind; 3] = [StepKind::Compile, StepKind::Format, StepKind::Hash];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKind::Compile => "compile",
            StepKind::Format => "format",
            StepKind::Hash => "hash",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable (image, version tag) pair naming the container image to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRef {
    pub image: String,
    pub version: String,
}

impl ToolRef {
    pub fn new(image: impl Into<String>, version: impl Into<String>) -> Self {
        ToolRef {
            image: image.into(),
            version: version.into(),
        }
    }

    /// Same image, different tag.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        ToolRef {
            image: self.image.clone(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ToolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.image, self.version)
    }
}

/// A host path exposed inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
    pub read_only: bool,
}

impl Mount {
    pub fn read_write(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Mount {
            host: host.into(),
            container: container.into(),
            read_only: false,
        }
    }

    pub fn read_only(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Mount {
            host: host.into(),
            container: container.into(),
            read_only: true,
        }
    }

    /// `-v` argument value: `host:container[:ro]`.
    pub fn to_volume_arg(&self) -> String {
        let mut spec = format!("{}:{}", self.host.display(), self.container);
        if self.read_only {
            spec.push_str(":ro");
        }
        spec
    }
}

/// Everything needed to run one step in its isolated environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub step: StepKind,
    pub tool: ToolRef,
    pub mounts: Vec<Mount>,
    /// Injected environment, in insertion order.
    pub env: Vec<(String, String)>,
    pub entrypoint: Option<String>,
    pub user: Option<String>,
    pub workdir: Option<String>,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(step: StepKind, tool: ToolRef) -> Self {
        Invocation {
            step,
            tool,
            mounts: Vec::new(),
            env: Vec::new(),
            entrypoint: None,
            user: None,
            workdir: None,
            args: Vec::new(),
        }
    }

    pub fn mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Arguments passed to the engine binary, starting with `run`.
    pub fn to_engine_args(&self) -> Vec<String> {
        let mut out = vec!["run".to_string(), "--rm".to_string()];

        if let Some(ref user) = self.user {
            out.push("--user".to_string());
            out.push(user.clone());
        }
        if let Some(ref workdir) = self.workdir {
            out.push("--workdir".to_string());
            out.push(workdir.clone());
        }
        for mount in &self.mounts {
            out.push("-v".to_string());
            out.push(mount.to_volume_arg());
        }
        for (key, value) in &self.env {
            out.push("--env".to_string());
            out.push(format!("{}={}", key, value));
        }
        if let Some(ref entrypoint) = self.entrypoint {
            out.push("--entrypoint".to_string());
            out.push(entrypoint.clone());
        }

        out.push(self.tool.to_string());
        out.extend(self.args.iter().cloned());
        out
    }
}

/// Privilege elevation prefix, read once from `SUDO` at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Elevation {
    words: Vec<String>,
}

impl Elevation {
    pub fn none() -> Self {
        Elevation::default()
    }

    /// Parse a raw `SUDO` value. Blank means no elevation.
    pub fn parse(raw: &str) -> Self {
        Elevation {
            words: raw.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn from_env() -> Self {
        std::env::var("SUDO")
            .map(|raw| Elevation::parse(&raw))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Program and argument vector for running `engine args...` under this
    /// elevation.
    pub fn wrap(&self, engine: &str, args: Vec<String>) -> (String, Vec<String>) {
        match self.words.split_first() {
            None => (engine.to_string(), args),
            Some((program, rest)) => {
                let mut full = rest.to_vec();
                full.push(engine.to_string());
                full.extend(args);
                (program.clone(), full)
            }
        }
    }
}

/// Outcome of a single successful step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutput {
    pub exit_code: i32,
    pub stdout: Vec<String>,
}

impl StepOutput {
    /// Last non-blank stdout line, trimmed.
    pub fn last_line(&self) -> Option<&str> {
        self.stdout
            .iter()
            .rev()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub artifact: PathBuf,
    pub program_hash: Option<String>,
    pub steps: Vec<StepKind>,
    pub elapsed_ms: u128,
}
