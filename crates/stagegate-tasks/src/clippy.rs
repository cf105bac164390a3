use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use stagegate_core::{RepoEntry, RepoTask, TaskError, TaskResult};

use crate::ProgramRunner;

lazy_static! {
    static ref SHORT_DIAGNOSTIC: Regex = Regex::new(
        r"^(?P<path>[^:\s][^:]*):(?P<line>\d+):(?P<column>\d+):\s+(?P<level>warning|error)(?:\[[^\]]+\])?:\s+(?P<message>.*)$"
    )
    .expect("diagnostic pattern is valid");
}

/// `[tasks.clippy]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClippyConfig {
    pub enabled: bool,
    /// Extra arguments appended after `--message-format=short`
    pub args: Vec<String>,
}

impl Default for ClippyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            args: Vec::new(),
        }
    }
}

/// One `path:line:col: level: message` line from `--message-format=short`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub level: String,
    pub message: String,
}

impl Diagnostic {
    /// Cargo reports paths relative to the workspace root, which is the
    /// directory cargo ran in or one of its ancestors inside the repository.
    fn concerns(&self, entry: &RepoEntry, run_dir: &Path) -> bool {
        if self.path.is_absolute() {
            return self.path == entry.file();
        }
        run_dir
            .ancestors()
            .take_while(|dir| dir.starts_with(entry.git_root()))
            .any(|dir| dir.join(&self.path) == entry.file())
    }
}

/// Nearest directory holding a `Cargo.toml`, searching up from the file to
/// the repository root. Falls back to the root itself.
fn manifest_dir(entry: &RepoEntry) -> PathBuf {
    let root = entry.git_root();
    entry
        .file()
        .ancestors()
        .skip(1)
        .take_while(|dir| dir.starts_with(root))
        .find(|dir| dir.join("Cargo.toml").is_file())
        .unwrap_or(root)
        .to_path_buf()
}

/// Extract every diagnostic from clippy's short output; other lines are ignored.
pub fn parse_diagnostics<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<Diagnostic> {
    lines
        .into_iter()
        .filter_map(|line| {
            let caps = SHORT_DIAGNOSTIC.captures(line.trim_end())?;
            Some(Diagnostic {
                path: PathBuf::from(&caps["path"]),
                line: caps["line"].parse().ok()?,
                column: caps["column"].parse().ok()?,
                level: caps["level"].to_string(),
                message: caps["message"].to_string(),
            })
        })
        .collect()
}

/// Runs `cargo clippy` once per Cargo package holding staged Rust sources
#[derive(Debug, Clone)]
pub struct ClippyTask {
    config: ClippyConfig,
    runner: ProgramRunner,
}

impl ClippyTask {
    pub const NAME: &'static str = "clippy";

    pub fn new(config: ClippyConfig, runner: ProgramRunner) -> Self {
        Self { config, runner }
    }

    fn args(&self) -> Vec<OsString> {
        ["clippy", "--message-format=short"]
            .into_iter()
            .map(OsString::from)
            .chain(self.config.args.iter().map(OsString::from))
            .collect()
    }

    async fn check_package(
        &self,
        run_dir: &Path,
        entries: &[&RepoEntry],
    ) -> Result<TaskResult, TaskError> {
        let output = self.runner.run("cargo", &self.args(), run_dir).await?;
        let diagnostics = parse_diagnostics(output.lines());

        // cargo failed before clippy produced any findings
        if !output.success() && diagnostics.is_empty() {
            warn!(
                exit_code = output.exit_code,
                dir = %run_dir.display(),
                "cargo clippy failed"
            );
            return Err(TaskError::InvalidOutput(output.stderr));
        }

        // Findings in files outside this commit do not block it
        let relevant: Vec<&Diagnostic> = diagnostics
            .iter()
            .filter(|d| entries.iter().any(|entry| d.concerns(entry, run_dir)))
            .collect();

        debug!(
            dir = %run_dir.display(),
            total = diagnostics.len(),
            relevant = relevant.len(),
            exit_code = output.exit_code,
            "Parsed clippy output"
        );

        if relevant.is_empty() {
            return Ok(TaskResult::Accepted);
        }

        for diagnostic in &relevant {
            info!(
                path = %diagnostic.path.display(),
                line = diagnostic.line,
                level = %diagnostic.level,
                "{}",
                diagnostic.message
            );
        }
        Ok(TaskResult::Rejected)
    }
}

#[async_trait]
impl RepoTask for ClippyTask {
    fn task_name(&self) -> &str {
        Self::NAME
    }

    fn can_process(&self, entry: &RepoEntry) -> bool {
        entry.has_extension("rs")
    }

    async fn call(&self, entries: &[RepoEntry]) -> Result<TaskResult, TaskError> {
        let mut packages: BTreeMap<PathBuf, Vec<&RepoEntry>> = BTreeMap::new();
        for entry in entries {
            packages.entry(manifest_dir(entry)).or_default().push(entry);
        }

        let mut result = TaskResult::Accepted;
        for (run_dir, entries) in &packages {
            result = result.raise_to(self.check_package(run_dir, entries).await?);
        }
        Ok(result)
    }
}
