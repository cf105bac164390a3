use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::ffi::OsString;
use std::time::Duration;
use tracing::debug;

use stagegate_core::{ConfigError, FileTask, RepoEntry, RepoTask, Task, TaskError, TaskResult};

use crate::digest::file_digests;
use crate::ProgramRunner;

/// How a command is invoked for the staged files it accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandScope {
    /// Once per file, with the file as last argument
    #[default]
    File,
    /// Once per commit, with every accepted file appended
    Repository,
}

/// One `[[tasks.command]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandConfig {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Matched against the whole repository-relative path; all files when absent
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub scope: CommandScope,
    /// The command rewrites files in place
    #[serde(default)]
    pub fixes: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// A user-defined external command
#[derive(Debug, Clone)]
pub struct CommandTask {
    config: CommandConfig,
    pattern: Option<Regex>,
    runner: ProgramRunner,
}

impl CommandTask {
    pub fn new(config: CommandConfig, runner: ProgramRunner) -> Result<Self, ConfigError> {
        let pattern = config
            .pattern
            .as_deref()
            .map(|pattern| {
                Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
                    ConfigError::InvalidPattern {
                        pattern: pattern.to_string(),
                        source,
                    }
                })
            })
            .transpose()?;

        let runner = match config.timeout_secs {
            Some(secs) => runner.with_timeout(Duration::from_secs(secs)),
            None => runner,
        };

        Ok(Self {
            config,
            pattern,
            runner,
        })
    }

    pub fn scope(&self) -> CommandScope {
        self.config.scope
    }

    /// Register under the capability matching the configured scope.
    pub fn into_task(self) -> Task {
        match self.config.scope {
            CommandScope::File => Task::file(self),
            CommandScope::Repository => Task::repo(self),
        }
    }

    fn accepts(&self, entry: &RepoEntry) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };
        let relative = entry.relative_path().to_string_lossy().replace('\\', "/");
        pattern.is_match(&relative)
    }

    async fn execute(&self, entries: &[RepoEntry]) -> Result<TaskResult, TaskError> {
        let Some(root) = entries.first().map(RepoEntry::git_root) else {
            return Ok(TaskResult::Accepted);
        };

        let files = || entries.iter().map(RepoEntry::file);
        let before = if self.config.fixes {
            Some(file_digests(files())?)
        } else {
            None
        };

        let args: Vec<OsString> = self
            .config
            .args
            .iter()
            .map(OsString::from)
            .chain(entries.iter().map(|e| e.relative_path().as_os_str().to_os_string()))
            .collect();

        let output = self.runner.run(&self.config.program, &args, root).await?;
        if !output.success() {
            debug!(
                task = %self.config.name,
                exit_code = output.exit_code,
                "Command rejected staged files"
            );
            return Ok(TaskResult::Rejected);
        }

        match before {
            Some(before) if before != file_digests(files())? => Ok(TaskResult::Modified),
            _ => Ok(TaskResult::Accepted),
        }
    }
}

#[async_trait]
impl FileTask for CommandTask {
    fn task_name(&self) -> &str {
        &self.config.name
    }

    fn can_process(&self, entry: &RepoEntry) -> bool {
        self.accepts(entry)
    }

    async fn call(&self, entry: &RepoEntry) -> Result<TaskResult, TaskError> {
        self.execute(std::slice::from_ref(entry)).await
    }
}

#[async_trait]
impl RepoTask for CommandTask {
    fn task_name(&self) -> &str {
        &self.config.name
    }

    fn can_process(&self, entry: &RepoEntry) -> bool {
        self.accepts(entry)
    }

    async fn call(&self, entries: &[RepoEntry]) -> Result<TaskResult, TaskError> {
        self.execute(entries).await
    }
}
