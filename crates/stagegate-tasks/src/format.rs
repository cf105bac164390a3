use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use tracing::debug;

use stagegate_core::{FileTask, RepoEntry, TaskError, TaskResult};

use crate::ProgramRunner;

/// `[tasks.format]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatConfig {
    pub enabled: bool,
    pub edition: String,
    /// Formatter binary, `rustfmt` unless overridden
    pub program: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            edition: "2021".to_string(),
            program: "rustfmt".to_string(),
        }
    }
}

/// Formats staged Rust sources with rustfmt.
///
/// The source is piped through rustfmt's stdin so out-of-line `mod`
/// children are left alone; only the staged file is ever rewritten.
#[derive(Debug, Clone)]
pub struct FormatTask {
    config: FormatConfig,
    runner: ProgramRunner,
}

impl FormatTask {
    pub const NAME: &'static str = "format";

    pub fn new(config: FormatConfig, runner: ProgramRunner) -> Self {
        Self { config, runner }
    }
}

#[async_trait]
impl FileTask for FormatTask {
    fn task_name(&self) -> &str {
        Self::NAME
    }

    fn can_process(&self, entry: &RepoEntry) -> bool {
        entry.has_extension("rs")
    }

    async fn call(&self, entry: &RepoEntry) -> Result<TaskResult, TaskError> {
        let source = std::fs::read(entry.file())?;

        let args: Vec<OsString> = vec![
            "--edition".into(),
            self.config.edition.clone().into(),
            "--emit".into(),
            "stdout".into(),
        ];
        // rustfmt.toml lookup starts at the working directory for stdin input
        let working_dir = entry.file().parent().unwrap_or(entry.git_root());
        let output = self
            .runner
            .run_with_input(&self.config.program, &args, working_dir, Some(source.clone()))
            .await?;

        // rustfmt only fails on source it cannot parse
        if !output.success() {
            debug!(path = %entry.relative_path().display(), "Formatter rejected file");
            return Ok(TaskResult::Rejected);
        }

        if output.stdout.as_bytes() == source.as_slice() {
            return Ok(TaskResult::Accepted);
        }

        std::fs::write(entry.file(), &output.stdout)?;
        debug!(path = %entry.relative_path().display(), "Formatted file");
        Ok(TaskResult::Modified)
    }
}
