//! Step execution: engine command construction, process spawning, output streaming.
//!
//! The child's stdout and stderr are relayed byte for byte to our own stdout
//! and stderr, so the tool's diagnostics are what the user sees. Stdout lines
//! are also captured (lossily decoded) for the caller.

use std::future::Future;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::error::BuildError;
use crate::models::{Elevation, Invocation, StepKind, StepOutput};

/// Runs one container invocation to completion.
pub trait CommandRunner {
    /// Run `invocation`, waiting for it to exit.
    ///
    /// Returns `Ok` only for a zero exit status.
    fn run(
        &self,
        invocation: &Invocation,
    ) -> impl Future<Output = Result<StepOutput, BuildError>> + Send;
}

/// Program and arguments for an invocation, elevation prefix included.
pub fn build_command_line(
    engine: &str,
    elevation: &Elevation,
    invocation: &Invocation,
) -> (String, Vec<String>) {
    elevation.wrap(engine, invocation.to_engine_args())
}

/// Human-readable command line for logs. Arguments containing whitespace
/// or quotes are single-quoted.
pub fn display_command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|word| {
            if word.is_empty() || word.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
                format!("'{}'", word.replace('\'', r"'\''"))
            } else {
                word.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Copy `reader` into `sink` byte for byte until EOF, keeping a lossy UTF-8
/// copy of every line when `capture` is set.
///
/// A failing sink (our own stdout closed by a downstream `head`, say) is
/// logged once and then skipped; the reader is still drained to the end.
pub(crate) async fn relay<R, W>(
    step: StepKind,
    stream: &str,
    reader: R,
    mut sink: W,
    capture: bool,
) -> Vec<String>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut captured = Vec::new();
    let mut sink_open = true;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if sink_open {
                    if let Err(e) = sink.write_all(&buf).await {
                        log::warn!("[Executor] {}: cannot relay {}: {}", step, stream, e);
                        sink_open = false;
                    }
                }
                if capture {
                    let line = String::from_utf8_lossy(&buf);
                    captured.push(line.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string());
                }
            }
            Err(e) => {
                log::warn!("[Executor] {}: {} read error: {}", step, stream, e);
                break;
            }
        }
    }

    if sink_open {
        let _ = sink.flush().await;
    }
    captured
}

/// Runs invocations through a container engine CLI (`docker` by default).
#[derive(Debug, Clone)]
pub struct DockerRunner {
    engine: String,
    elevation: Elevation,
    dry_run: bool,
}

impl DockerRunner {
    pub fn new(engine: impl Into<String>, elevation: Elevation) -> Self {
        DockerRunner {
            engine: engine.into(),
            elevation,
            dry_run: false,
        }
    }

    /// Log the command lines instead of spawning anything.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn elevation(&self) -> &Elevation {
        &self.elevation
    }
}

impl CommandRunner for DockerRunner {
    async fn run(&self, invocation: &Invocation) -> Result<StepOutput, BuildError> {
        let step = invocation.step;
        let (program, args) = build_command_line(&self.engine, &self.elevation, invocation);
        let shown = display_command_line(&program, &args);

        if self.dry_run {
            log::info!("[Executor] [DRY-RUN] {}: {}", step, shown);
            return Ok(StepOutput::default());
        }

        log::debug!("[Executor] {}: {}", step, shown);

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| BuildError::SpawnFailed {
                step,
                reason: format!("{}: {}", program, e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| BuildError::SpawnFailed {
            step,
            reason: "Failed to capture stdout".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| BuildError::SpawnFailed {
            step,
            reason: "Failed to capture stderr".to_string(),
        })?;

        // Both pipes are drained to EOF concurrently; a full pipe would
        // block the child and `wait()` would never return.
        let (captured, _) = tokio::join!(
            relay(step, "stdout", stdout, tokio::io::stdout(), true),
            relay(step, "stderr", stderr, tokio::io::stderr(), false),
        );

        let status = child.wait().await.map_err(|e| BuildError::SpawnFailed {
            step,
            reason: format!("Failed to wait for process: {}", e),
        })?;

        match status.code() {
            Some(0) => Ok(StepOutput {
                exit_code: 0,
                stdout: captured,
            }),
            Some(code) => Err(BuildError::InvocationFailed { step, code }),
            None => Err(BuildError::Terminated { step }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Mount, StepKind, ToolRef};

    fn sample() -> Invocation {
        Invocation::new(StepKind::Hash, ToolRef::new("starknet/cairo-lang", "0.13.3"))
            .mount(Mount::read_only("/repo/programs/p.json", "/program.json"))
            .entrypoint("/hash.sh")
    }

    #[test]
    fn test_command_line_without_elevation() {
        let (program, args) = build_command_line("docker", &Elevation::none(), &sample());
        assert_eq!(program, "docker");
        assert_eq!(args[0], "run");
        assert_eq!(args.last().unwrap(), "starknet/cairo-lang:0.13.3");
    }

    #[test]
    fn test_command_line_with_elevation() {
        let (program, args) = build_command_line("docker", &Elevation::parse("sudo"), &sample());
        assert_eq!(program, "sudo");
        assert_eq!(&args[..2], &["docker", "run"]);
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let shown = display_command_line("docker", &["run".to_string(), "a b".to_string()]);
        assert_eq!(shown, "docker run 'a b'");
        let shown = display_command_line("x", &["it's".to_string()]);
        assert_eq!(shown, r"x 'it'\''s'");
    }

    #[tokio::test]
    async fn test_dry_run_spawns_nothing() {
        let runner = DockerRunner::new("definitely-not-a-real-engine", Elevation::none()).dry_run(true);
        let out = runner.run(&sample()).await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_missing_engine_is_spawn_failure() {
        let runner = DockerRunner::new("definitely-not-a-real-engine", Elevation::none());
        let err = runner.run(&sample()).await.unwrap_err();
        assert!(matches!(err, BuildError::SpawnFailed { step: StepKind::Hash, .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stdout_is_captured() {
        // `echo` stands in for the engine and prints the arguments it was given.
        let runner = DockerRunner::new("echo", Elevation::none());
        let out = runner.run(&sample()).await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.last_line(), Some(sample().to_engine_args().join(" ").as_str()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invalid_utf8_and_large_output_are_drained() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let engine = temp_dir.path().join("noisy-engine");
        std::fs::write(
            &engine,
            "#!/bin/sh\n\
             printf '\\377\\n'\n\
             head -c 200000 /dev/zero | tr '\\0' a\n\
             echo\n\
             head -c 200000 /dev/zero | tr '\\0' b >&2\n\
             echo 0xabc\n",
        )
        .unwrap();
        std::fs::set_permissions(&engine, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = DockerRunner::new(engine.display().to_string(), Elevation::none());
        let out = tokio::time::timeout(std::time::Duration::from_secs(30), runner.run(&sample()))
            .await
            .expect("run must finish once the engine exits")
            .unwrap();

        assert_eq!(out.stdout.len(), 3);
        assert_eq!(out.stdout[0], "\u{FFFD}");
        assert_eq!(out.stdout[1].len(), 200_000);
        assert_eq!(out.last_line(), Some("0xabc"));
    }

    /// Sink that rejects every write, like a stdout whose reader has gone away.
    struct ClosedPipe;

    impl AsyncWrite for ClosedPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_closed_sink_still_drains_and_captures() {
        let input: &[u8] = b"computing\r\n0x5ca1ab1e\n";
        let captured = relay(StepKind::Hash, "stdout", input, ClosedPipe, true).await;
        assert_eq!(captured, vec!["computing", "0x5ca1ab1e"]);
    }

    #[tokio::test]
    async fn test_relay_copies_bytes_verbatim() {
        let input: &[u8] = b"\xffraw\nno newline at end";
        let mut sink = Vec::new();
        let captured = relay(StepKind::Compile, "stdout", input, &mut sink, true).await;
        assert_eq!(sink, input);
        assert_eq!(captured, vec!["\u{FFFD}raw", "no newline at end"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_invocation_failure() {
        let runner = DockerRunner::new("true", Elevation::none());
        assert!(runner.run(&sample()).await.is_ok());

        let runner = DockerRunner::new("false", Elevation::none());
        let err = runner.run(&sample()).await.unwrap_err();
        assert!(matches!(
            err,
            BuildError::InvocationFailed {
                step: StepKind::Hash,
                code: 1
            }
        ));
    }
}
