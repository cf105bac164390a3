use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use stagegate_git::VersionControl;
use stagegate_logging::{EventSink, LogEvent};

use crate::config::{HooksConfig, ProjectConfig, CONFIG_FILE_NAME};
use crate::task::{FileTask, RepoTask, TaskLoader, TaskRegistry};
use crate::{HookError, HookResult, RepoEntry, StagedFileCollector, TaskResult};

/// Outcome of one pipeline step: keep folding, or stop with a final result
type Flow = ControlFlow<HookResult, HookResult>;

/// Runs every registered task over the staged files and folds the verdicts
/// into one [`HookResult`].
pub struct Hooks {
    vcs: Arc<dyn VersionControl>,
    loader: Arc<dyn TaskLoader>,
    sink: Arc<dyn EventSink>,
    working_dir: PathBuf,
    config: HooksConfig,
}

impl Hooks {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        loader: Arc<dyn TaskLoader>,
        sink: Arc<dyn EventSink>,
        working_dir: PathBuf,
        config: HooksConfig,
    ) -> Self {
        Self {
            vcs,
            loader,
            sink,
            working_dir,
            config,
        }
    }

    /// Run the full pipeline once.
    ///
    /// Fixed, fully staged files are re-staged as a side effect.
    pub async fn run(&self) -> Result<HookResult, HookError> {
        let started = Instant::now();

        self.sink.log(&LogEvent::HooksStarted {
            working_dir: self.working_dir.clone(),
            continue_on_rejected: self.config.continue_on_rejected,
        });

        let project = self.load_project_config()?;
        if !project.enabled {
            info!("Hooks disabled by configuration");
            self.sink.log(&LogEvent::HooksDisabled);
            return Ok(self.finish(HookResult::Clean, started));
        }

        let registry = self.loader.load(&project)?;
        let exclude = project.exclude_patterns()?;
        debug!(tasks = ?registry.names(), "Loaded tasks");

        let collector = StagedFileCollector::new(self.vcs.as_ref(), &self.working_dir, &exclude)?;
        let entries: Vec<RepoEntry> = collector.collect()?.collect();

        self.sink.log(&LogEvent::EntriesCollected {
            count: entries.len(),
        });

        // Repository tasks that run on empty batches are skipped here too
        if entries.is_empty() {
            return Ok(self.finish(HookResult::Clean, started));
        }

        let result = match self.run_pipeline(&registry, &entries).await? {
            ControlFlow::Continue(result) => result,
            ControlFlow::Break(result) => {
                warn!("Hooks aborted after rejection");
                result
            }
        };

        Ok(self.finish(result, started))
    }

    fn load_project_config(&self) -> Result<ProjectConfig, HookError> {
        let config = match &self.config.config_path {
            Some(path) => ProjectConfig::load_file(path)?,
            None => ProjectConfig::load(&self.vcs.root().join(CONFIG_FILE_NAME))?
                .unwrap_or_default(),
        };
        Ok(config)
    }

    fn finish(&self, result: HookResult, started: Instant) -> HookResult {
        self.sink.log(&LogEvent::HooksCompleted {
            result: result.to_string(),
            code: result.code(),
            duration_secs: started.elapsed().as_secs_f64(),
        });
        result
    }

    async fn run_pipeline(
        &self,
        registry: &TaskRegistry,
        entries: &[RepoEntry],
    ) -> Result<Flow, HookError> {
        let mut result = HookResult::Clean;

        for entry in entries {
            result = match self.scan_entry(registry, entry, result).await? {
                ControlFlow::Continue(result) => result,
                abort => return Ok(abort),
            };
        }

        for task in registry.repo_tasks() {
            result = match self.run_repo_task(task, entries, result).await? {
                ControlFlow::Continue(result) => result,
                abort => return Ok(abort),
            };
        }

        Ok(ControlFlow::Continue(result))
    }

    /// Run every file task that accepts `entry`, then fold the combined
    /// verdict into `result`.
    async fn scan_entry(
        &self,
        registry: &TaskRegistry,
        entry: &RepoEntry,
        result: HookResult,
    ) -> Result<Flow, HookError> {
        let path = entry.relative_path().to_path_buf();
        self.sink.log(&LogEvent::ScanStarted { path: path.clone() });

        let mut entry_result = TaskResult::Accepted;
        for task in registry.file_tasks() {
            if !task.can_process(entry) {
                continue;
            }

            let task_result = self.call_file_task(task, entry).await?;
            self.sink.log(&LogEvent::TaskCompleted {
                task: task.task_name().to_string(),
                path: Some(path.clone()),
                result: task_result.to_string(),
            });
            entry_result = entry_result.raise_to(task_result);
        }

        let flow = self.convert(entry_result, Some(entry), None)?;
        if let ControlFlow::Continue(hook_result) = flow {
            self.sink.log(&LogEvent::EntryCompleted {
                path,
                result: hook_result.to_string(),
            });
        }

        Ok(join(result, flow))
    }

    async fn run_repo_task(
        &self,
        task: &dyn RepoTask,
        entries: &[RepoEntry],
        mut result: HookResult,
    ) -> Result<Flow, HookError> {
        let name = task.task_name();
        let batch: Vec<RepoEntry> = entries
            .iter()
            .filter(|entry| task.can_process(entry))
            .cloned()
            .collect();

        if batch.is_empty() && !task.call_for_empty_entries() {
            debug!(task = name, "No staged files for repository task");
            return Ok(ControlFlow::Continue(result));
        }

        self.sink.log(&LogEvent::RepoTaskStarted {
            task: name.to_string(),
            entries: batch.len(),
        });

        let task_result = task.call(&batch).await.map_err(|source| HookError::Task {
            task: name.to_string(),
            source,
        })?;

        self.sink.log(&LogEvent::RepoTaskCompleted {
            task: name.to_string(),
            entries: batch.len(),
            result: task_result.to_string(),
        });

        if batch.is_empty() {
            let flow = self.convert(task_result, None, Some(name))?;
            return Ok(join(result, flow));
        }

        for entry in &batch {
            result = match join(result, self.convert(task_result, Some(entry), Some(name))?) {
                ControlFlow::Continue(result) => result,
                abort => return Ok(abort),
            };
        }

        Ok(ControlFlow::Continue(result))
    }

    async fn call_file_task(
        &self,
        task: &dyn FileTask,
        entry: &RepoEntry,
    ) -> Result<TaskResult, HookError> {
        task.call(entry).await.map_err(|source| HookError::Task {
            task: task.task_name().to_string(),
            source,
        })
    }

    /// Map a task verdict for `entry` (if any) to a hook result.
    ///
    /// `Modified` on a fully staged entry re-stages it; `Rejected` breaks
    /// unless `continue_on_rejected` is set.
    fn convert(
        &self,
        task_result: TaskResult,
        entry: Option<&RepoEntry>,
        task: Option<&str>,
    ) -> Result<Flow, HookError> {
        let hook_result = match (task_result, entry) {
            (TaskResult::Accepted, _) => HookResult::Clean,
            (TaskResult::Modified, Some(entry)) if entry.partially_staged() => {
                warn!(
                    path = %entry.relative_path().display(),
                    "Fixed file has unstaged changes, not re-staging"
                );
                HookResult::HasUnstagedChanges
            }
            (TaskResult::Modified, Some(entry)) => {
                self.vcs.stage(entry.relative_path())?;
                self.sink.log(&LogEvent::Restaged {
                    path: entry.relative_path().to_path_buf(),
                });
                HookResult::HasChanges
            }
            (TaskResult::Modified, None) => HookResult::HasChanges,
            (TaskResult::Rejected, _) => {
                let aborted = !self.config.continue_on_rejected;
                self.sink.log(&LogEvent::Rejected {
                    task: task.map(str::to_string),
                    path: entry.map(|e| e.relative_path().to_path_buf()),
                    aborted,
                });
                if aborted {
                    return Ok(ControlFlow::Break(HookResult::Rejected));
                }
                HookResult::Rejected
            }
        };

        Ok(ControlFlow::Continue(hook_result))
    }
}

/// Fold one converted result into the running result; an abort discards
/// the accumulated value.
fn join(result: HookResult, flow: Flow) -> Flow {
    match flow {
        ControlFlow::Continue(hook_result) => ControlFlow::Continue(result.raise_to(hook_result)),
        abort => abort,
    }
}
