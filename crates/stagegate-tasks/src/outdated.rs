use async_trait::async_trait;
use semver::Version;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use stagegate_core::{RepoEntry, RepoTask, TaskError, TaskResult};

use crate::ProgramRunner;

/// Smallest version component change that counts as outdated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutdatedLevel {
    #[default]
    Major,
    Minor,
    Patch,
    Any,
}

impl OutdatedLevel {
    pub fn is_outdated(&self, current: &Version, latest: &Version) -> bool {
        match self {
            Self::Major => latest.major != current.major,
            Self::Minor => (latest.major, latest.minor) != (current.major, current.minor),
            Self::Patch => {
                (latest.major, latest.minor, latest.patch)
                    != (current.major, current.minor, current.patch)
            }
            Self::Any => latest != current,
        }
    }
}

/// `[tasks.outdated]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutdatedConfig {
    pub enabled: bool,
    pub level: OutdatedLevel,
    /// Crate names never reported
    pub allowed: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OutdatedReport {
    #[serde(default)]
    dependencies: Vec<OutdatedDependency>,
}

/// One row of `cargo outdated --format json`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutdatedDependency {
    pub name: String,
    pub project: String,
    pub latest: String,
}

impl OutdatedDependency {
    /// Both versions parsed; `None` for markers like `---` or `Removed`
    fn versions(&self) -> Option<(Version, Version)> {
        let current = Version::parse(&self.project).ok()?;
        let latest = Version::parse(&self.latest).ok()?;
        Some((current, latest))
    }
}

/// Parse cargo-outdated JSON output, one report per workspace member and line.
pub fn parse_report(stdout: &str) -> Result<Vec<OutdatedDependency>, TaskError> {
    let mut dependencies = Vec::new();
    for line in stdout.lines().map(str::trim).filter(|l| l.starts_with('{')) {
        let report: OutdatedReport = serde_json::from_str(line)
            .map_err(|e| TaskError::InvalidOutput(format!("cargo outdated: {}", e)))?;
        dependencies.extend(report.dependencies);
    }
    Ok(dependencies)
}

/// Rejects commits while direct dependencies lag behind their latest release.
///
/// Accepts no entries and runs on the empty batch, so it applies to every
/// commit regardless of which files are staged.
#[derive(Debug, Clone)]
pub struct OutdatedTask {
    config: OutdatedConfig,
    root: PathBuf,
    runner: ProgramRunner,
}

impl OutdatedTask {
    pub const NAME: &'static str = "outdated";

    pub fn new(config: OutdatedConfig, root: PathBuf, runner: ProgramRunner) -> Self {
        Self {
            config,
            root,
            runner,
        }
    }

    /// Dependencies that are outdated at the configured level and not allowed
    pub fn outdated<'a>(
        &self,
        dependencies: &'a [OutdatedDependency],
    ) -> Vec<&'a OutdatedDependency> {
        dependencies
            .iter()
            .filter(|dep| !self.config.allowed.contains(&dep.name))
            .filter(|dep| match dep.versions() {
                Some((current, latest)) => self.config.level.is_outdated(&current, &latest),
                None => {
                    debug!(
                        name = %dep.name,
                        latest = %dep.latest,
                        "Skipping unversioned dependency"
                    );
                    false
                }
            })
            .collect()
    }
}

#[async_trait]
impl RepoTask for OutdatedTask {
    fn task_name(&self) -> &str {
        Self::NAME
    }

    fn can_process(&self, _entry: &RepoEntry) -> bool {
        false
    }

    fn call_for_empty_entries(&self) -> bool {
        true
    }

    async fn call(&self, _entries: &[RepoEntry]) -> Result<TaskResult, TaskError> {
        let args: Vec<OsString> = ["outdated", "--root-deps-only", "--format", "json"]
            .into_iter()
            .map(OsString::from)
            .collect();
        let output = self.runner.run("cargo", &args, &self.root).await?;

        if !output.success() {
            warn!(exit_code = output.exit_code, "cargo outdated failed");
            return Err(TaskError::InvalidOutput(output.stderr));
        }

        let dependencies = parse_report(&output.stdout)?;
        let outdated = self.outdated(&dependencies);
        if outdated.is_empty() {
            return Ok(TaskResult::Accepted);
        }

        for dep in outdated {
            info!(
                name = %dep.name,
                current = %dep.project,
                latest = %dep.latest,
                "Outdated dependency"
            );
        }
        Ok(TaskResult::Rejected)
    }
}
