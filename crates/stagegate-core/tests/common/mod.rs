#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stagegate_core::{
    ConfigError, FileTask, Hooks, HooksConfig, ProjectConfig, RepoEntry, RepoTask, Task,
    TaskError, TaskLoader, TaskRegistry, TaskResult,
};
use stagegate_git::{GitError, VersionControl};
use stagegate_logging::{EventSink, LogEvent};
use tempfile::TempDir;

/// Shared, ordered record of task invocations across all fakes in a test.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Temp directory acting as a repository working tree.
pub struct Workspace {
    _dir: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        Self { _dir: dir, root }
    }

    pub fn write(&self, relative: &str, content: &str) -> &Self {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    pub fn files(&self, relatives: &[&str]) -> &Self {
        for relative in relatives {
            self.write(relative, "// staged\n");
        }
        self
    }
}

/// In-memory repository: reports fixed path lists and records stage calls.
pub struct FakeVcs {
    root: PathBuf,
    staged: Vec<PathBuf>,
    unstaged: Vec<PathBuf>,
    stage_calls: Mutex<Vec<PathBuf>>,
}

impl FakeVcs {
    pub fn new(root: &Path, staged: &[&str], unstaged: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            root: root.to_path_buf(),
            staged: staged.iter().map(PathBuf::from).collect(),
            unstaged: unstaged.iter().map(PathBuf::from).collect(),
            stage_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn stage_calls(&self) -> Vec<PathBuf> {
        self.stage_calls.lock().unwrap().clone()
    }
}

impl VersionControl for FakeVcs {
    fn root(&self) -> &Path {
        &self.root
    }

    fn unstaged_paths(&self) -> Result<Vec<PathBuf>, GitError> {
        Ok(self.unstaged.clone())
    }

    fn staged_paths(&self) -> Result<Vec<PathBuf>, GitError> {
        Ok(self.staged.clone())
    }

    fn stage(&self, path: &Path) -> Result<(), GitError> {
        self.stage_calls.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// File task returning a scripted verdict per relative path (default accepted).
pub struct ScriptedFileTask {
    name: &'static str,
    extension: Option<&'static str>,
    verdicts: HashMap<String, TaskResult>,
    failing: bool,
    log: CallLog,
}

impl ScriptedFileTask {
    pub fn new(name: &'static str, log: &CallLog) -> Self {
        Self {
            name,
            extension: None,
            verdicts: HashMap::new(),
            failing: false,
            log: log.clone(),
        }
    }

    pub fn only(mut self, extension: &'static str) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn verdict(mut self, path: &str, result: TaskResult) -> Self {
        self.verdicts.insert(path.to_string(), result);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl FileTask for ScriptedFileTask {
    fn task_name(&self) -> &str {
        self.name
    }

    fn can_process(&self, entry: &RepoEntry) -> bool {
        self.extension.map_or(true, |ext| entry.has_extension(ext))
    }

    async fn call(&self, entry: &RepoEntry) -> Result<TaskResult, TaskError> {
        let path = relative(entry);
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, path));

        if self.failing {
            return Err(TaskError::InvalidOutput(format!("{} exploded", self.name)));
        }

        Ok(self.verdicts.get(&path).copied().unwrap_or_default())
    }
}

/// Repository task returning one scripted verdict for its batch.
pub struct ScriptedRepoTask {
    name: &'static str,
    extension: Option<&'static str>,
    result: TaskResult,
    call_for_empty: bool,
    log: CallLog,
}

impl ScriptedRepoTask {
    pub fn new(name: &'static str, result: TaskResult, log: &CallLog) -> Self {
        Self {
            name,
            extension: None,
            result,
            call_for_empty: false,
            log: log.clone(),
        }
    }

    pub fn only(mut self, extension: &'static str) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn call_for_empty(mut self) -> Self {
        self.call_for_empty = true;
        self
    }
}

#[async_trait]
impl RepoTask for ScriptedRepoTask {
    fn task_name(&self) -> &str {
        self.name
    }

    fn can_process(&self, entry: &RepoEntry) -> bool {
        self.extension.map_or(true, |ext| entry.has_extension(ext))
    }

    fn call_for_empty_entries(&self) -> bool {
        self.call_for_empty
    }

    async fn call(&self, entries: &[RepoEntry]) -> Result<TaskResult, TaskError> {
        let paths: Vec<String> = entries.iter().map(relative).collect();
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:[{}]", self.name, paths.join(",")));
        Ok(self.result)
    }
}

/// Hands out a prepared registry once.
pub struct FixedTasks(Mutex<Option<TaskRegistry>>);

impl FixedTasks {
    pub fn new(tasks: Vec<Task>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(Some(tasks.into_iter().collect()))))
    }
}

impl TaskLoader for FixedTasks {
    fn load(&self, _config: &ProjectConfig) -> Result<TaskRegistry, ConfigError> {
        Ok(self.0.lock().unwrap().take().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LogEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn log(&self, event: &LogEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn hooks(
    working_dir: &Path,
    vcs: &Arc<FakeVcs>,
    tasks: Vec<Task>,
    sink: &Arc<RecordingSink>,
    config: HooksConfig,
) -> Hooks {
    Hooks::new(
        vcs.clone(),
        FixedTasks::new(tasks),
        sink.clone(),
        working_dir.to_path_buf(),
        config,
    )
}

fn relative(entry: &RepoEntry) -> String {
    entry.relative_path().to_string_lossy().replace('\\', "/")
}
