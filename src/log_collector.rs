//! Decoupled logging pipeline for pipeline runs.
//!
//! ```text
//! log::info!() / log_parsed!()
//!     |
//! [LogCollector] (log::Log, non-blocking)
//!     | (crossbeam unbounded channel)
//!     v
//! [writer thread] ---> stderr
//!                 \--> <log_dir>/program-builder-<ts>.log (optional)
//! ```
//!
//! Stdout stays reserved for the tools' own output and the program hash;
//! every orchestrator message goes to stderr.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub level: Level,
    /// "full" or "parsed"
    pub log_type: String,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(level: Level, message: String) -> Self {
        LogLine {
            message,
            level,
            log_type: "full".to_string(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(level: Level, message: String) -> Self {
        LogLine {
            log_type: "parsed".to_string(),
            ..LogLine::new(level, message)
        }
    }

    /// Rendered form, as written to every sink.
    pub fn render(&self) -> String {
        if self.log_type == "parsed" {
            format!("[{}] [{}] ==> {}", self.timestamp, self.level, self.message)
        } else {
            format!("[{}] [{}] {}", self.timestamp, self.level, self.message)
        }
    }
}

/// Session log file name for a run starting now.
pub fn session_log_name() -> String {
    format!("program-builder-{}.log", Local::now().format("%Y%m%d-%H%M%S"))
}

/// Unified logger that hands records to a background writer thread
#[derive(Clone)]
pub struct LogCollector {
    /// crossbeam unbounded sender, usable from any thread or runtime
    tx: Sender<LogMessage>,
    max_level: LevelFilter,
    session_log: Option<PathBuf>,
}

impl LogCollector {
    /// Create a collector writing to stderr and, if `log_dir` is given, to a
    /// fresh session file inside it.
    pub fn new(max_level: LevelFilter, log_dir: Option<&Path>) -> Result<Self, String> {
        let mut file: Option<File> = None;
        let mut session_log = None;

        if let Some(dir) = log_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create log directory {}: {}", dir.display(), e))?;
            let path = dir.join(session_log_name());
            let handle = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))?;
            file = Some(handle);
            session_log = Some(path);
        }

        Ok(Self::spawn(max_level, Box::new(std::io::stderr()), file, session_log))
    }

    /// Collector writing to an arbitrary sink instead of stderr.
    pub fn with_writer(max_level: LevelFilter, writer: Box<dyn Write + Send>) -> Self {
        Self::spawn(max_level, writer, None, None)
    }

    fn spawn(
        max_level: LevelFilter,
        mut console: Box<dyn Write + Send>,
        mut file: Option<File>,
        session_log: Option<PathBuf>,
    ) -> Self {
        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread, not a tokio task: records logged after the runtime shuts
        // down still reach their sinks.
        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let rendered = line.render();
                        let _ = writeln!(console, "{}", rendered);
                        if let Some(ref mut f) = file {
                            let _ = writeln!(f, "{}", rendered);
                        }
                    }
                    LogMessage::Flush(done) => {
                        let _ = console.flush();
                        if let Some(ref mut f) = file {
                            let _ = f.flush();
                        }
                        let _ = done.send(());
                    }
                }
            }
        });

        LogCollector {
            tx,
            max_level,
            session_log,
        }
    }

    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    /// Path of the session log file, when file logging is on.
    pub fn session_log_path(&self) -> Option<&Path> {
        self.session_log.as_deref()
    }

    /// Send a log line (non-blocking, cannot fail)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    pub fn log_str(&self, message: impl Into<String>) {
        self.log_line(LogLine::new(Level::Info, message.into()));
    }

    pub fn log_parsed(&self, message: impl Into<String>) {
        self.log_line(LogLine::parsed(Level::Info, message.into()));
    }

    /// Block until every line sent before this call has been written.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (done_tx, done_rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(done_tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        done_rx
            .recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }

    /// Register as the global `log` backend.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        let level = self.max_level;
        log::set_boxed_logger(Box::new(self)).map(|()| log::set_max_level(level))
    }
}

/// Wires log::info!(), log::warn!(), log::error!() into the collector
impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = record.args().to_string();
        // Target-aware routing: "parsed" marks high-level milestones
        if record.target() == "parsed" {
            self.log_line(LogLine::parsed(record.level(), message));
        } else {
            self.log_line(LogLine::new(record.level(), message));
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}
