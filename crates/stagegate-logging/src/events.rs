use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Type of output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    Stdout,
    Stderr,
}

/// Structured status events emitted by a hook run.
///
/// Results are carried as their snake_case names (`accepted`, `has_changes`,
/// ...) so this crate stays independent of the engine's types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    HooksStarted {
        working_dir: PathBuf,
        continue_on_rejected: bool,
    },
    HooksDisabled,
    EntriesCollected {
        count: usize,
    },
    ScanStarted {
        path: PathBuf,
    },
    TaskCompleted {
        task: String,
        path: Option<PathBuf>,
        result: String,
    },
    EntryCompleted {
        path: PathBuf,
        result: String,
    },
    Restaged {
        path: PathBuf,
    },
    RepoTaskStarted {
        task: String,
        entries: usize,
    },
    RepoTaskCompleted {
        task: String,
        entries: usize,
        result: String,
    },
    Rejected {
        task: Option<String>,
        path: Option<PathBuf>,
        aborted: bool,
    },
    /// Streaming output line from a task's child process
    TaskOutputLine {
        task: String,
        stream: StreamType,
        line: String,
    },
    HooksCompleted {
        result: String,
        code: i32,
        duration_secs: f64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Receiver of hook status events.
///
/// Implementations must not fail the run; errors are swallowed.
pub trait EventSink: Send + Sync {
    fn log(&self, event: &LogEvent);
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn log(&self, _event: &LogEvent) {}
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for stagegate events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl EventSink for Logger {
    fn log(&self, event: &LogEvent) {
        Logger::log(self, event);
    }
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::HooksStarted {
                working_dir,
                continue_on_rejected,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    "▶".bright_blue(),
                    "stagegate".bold().bright_white(),
                    working_dir.display().to_string().dimmed()
                );
                if *continue_on_rejected {
                    let _ = writeln!(
                        stderr,
                        "  {}",
                        "continuing past rejected files".dimmed()
                    );
                }
            }
            LogEvent::HooksDisabled => {
                let _ = writeln!(
                    stderr,
                    "{} {}",
                    "⚠".bright_yellow(),
                    "stagegate is disabled by configuration".bright_yellow()
                );
            }
            LogEvent::EntriesCollected { count } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} staged {}",
                    "📁".dimmed(),
                    count,
                    if *count == 1 { "file" } else { "files" }
                );
            }
            LogEvent::ScanStarted { path } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    path.display().to_string().bright_cyan()
                );
            }
            LogEvent::TaskCompleted { task, result, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} {}: {}",
                    result_symbol(result),
                    task,
                    style_result(result)
                );
            }
            LogEvent::EntryCompleted { .. } => {
                // Per-task lines already cover this
            }
            LogEvent::Restaged { path } => {
                let _ = writeln!(
                    stderr,
                    "    {} re-staged {}",
                    "↻".bright_yellow(),
                    path.display()
                );
            }
            LogEvent::RepoTaskStarted { task, entries } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} ({} {})",
                    "▶".bright_magenta(),
                    task.bright_magenta().bold(),
                    entries,
                    if *entries == 1 { "file" } else { "files" }
                );
            }
            LogEvent::RepoTaskCompleted { result, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    result_symbol(result),
                    style_result(result)
                );
            }
            LogEvent::Rejected {
                task,
                path,
                aborted,
            } => {
                let subject = match (task, path) {
                    (Some(task), Some(path)) => format!("{} rejected {}", task, path.display()),
                    (Some(task), None) => format!("{} rejected the commit", task),
                    (None, Some(path)) => format!("{} was rejected", path.display()),
                    (None, None) => "commit was rejected".to_string(),
                };
                let _ = writeln!(stderr, "  {} {}", "✗".bright_red(), subject.bright_red());
                if *aborted {
                    let _ = writeln!(stderr, "  {}", "skipping remaining checks".dimmed());
                }
            }
            LogEvent::TaskOutputLine { line, stream, .. } => {
                let prefix = "    │".dimmed();
                let styled_line = match stream {
                    StreamType::Stdout => line.normal(),
                    StreamType::Stderr => line.dimmed(),
                };
                let _ = writeln!(stderr, "{} {}", prefix, styled_line);
            }
            LogEvent::HooksCompleted {
                result,
                duration_secs,
                ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} ({:.1}s)",
                    result_symbol(result),
                    style_result(result).bold(),
                    duration_secs
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::HooksStarted { working_dir, .. } => {
                format!("[{}] hooks:start {}", timestamp, working_dir.display())
            }
            LogEvent::HooksDisabled => format!("[{}] hooks:disabled", timestamp),
            LogEvent::EntriesCollected { count } => {
                format!("[{}] collect:{}", timestamp, count)
            }
            LogEvent::ScanStarted { path } => {
                format!("[{}] scan:{}", timestamp, path.display())
            }
            LogEvent::TaskCompleted { task, path, result } => match path {
                Some(path) => format!("[{}] {}:{} {}", timestamp, task, path.display(), result),
                None => format!("[{}] {} {}", timestamp, task, result),
            },
            LogEvent::EntryCompleted { path, result } => {
                format!("[{}] entry:{} {}", timestamp, path.display(), result)
            }
            LogEvent::Restaged { path } => {
                format!("[{}] restage:{}", timestamp, path.display())
            }
            LogEvent::RepoTaskStarted { task, entries } => {
                format!("[{}] {}:start {}f", timestamp, task, entries)
            }
            LogEvent::RepoTaskCompleted {
                task,
                entries,
                result,
            } => format!("[{}] {}:done {}f {}", timestamp, task, entries, result),
            LogEvent::Rejected { task, path, .. } => format!(
                "[{}] rejected task={} path={}",
                timestamp,
                task.as_deref().unwrap_or("-"),
                path.as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string())
            ),
            LogEvent::TaskOutputLine { task, line, .. } => {
                format!("[{}] {}> {}", timestamp, task, line)
            }
            LogEvent::HooksCompleted {
                result,
                code,
                duration_secs,
            } => format!(
                "[{}] hooks:done {} exit={} {:.1}s",
                timestamp, result, code, duration_secs
            ),
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}

fn style_result(result: &str) -> ColoredString {
    match result {
        "accepted" | "clean" => result.bright_green(),
        "modified" | "has_changes" => result.bright_yellow(),
        "has_unstaged_changes" => result.yellow(),
        "rejected" => result.bright_red(),
        _ => result.normal(),
    }
}

fn result_symbol(result: &str) -> ColoredString {
    match result {
        "accepted" | "clean" => "✓".bright_green(),
        "modified" | "has_changes" | "has_unstaged_changes" => "~".bright_yellow(),
        "rejected" => "✗".bright_red(),
        _ => "·".normal(),
    }
}
