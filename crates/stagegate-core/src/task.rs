use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ConfigError, ProjectConfig};
use crate::{RepoEntry, TaskResult};

/// Errors that stop a task from producing a verdict at all
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Task timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected task output: {0}")]
    InvalidOutput(String),
}

/// A task that checks (and possibly fixes) one staged file at a time
#[async_trait]
pub trait FileTask: Send + Sync {
    /// Stable identifier used in logs
    fn task_name(&self) -> &str;

    /// Whether this task wants to see `entry` at all
    fn can_process(&self, entry: &RepoEntry) -> bool;

    /// Check `entry`; may rewrite the file in place
    async fn call(&self, entry: &RepoEntry) -> Result<TaskResult, TaskError>;
}

/// A task that checks every accepted entry in a single invocation
#[async_trait]
pub trait RepoTask: Send + Sync {
    /// Stable identifier used in logs
    fn task_name(&self) -> &str;

    /// Whether `entry` belongs in the batch passed to [`RepoTask::call`]
    fn can_process(&self, entry: &RepoEntry) -> bool;

    /// Run even when no staged entry was accepted
    fn call_for_empty_entries(&self) -> bool {
        false
    }

    /// Check the batch; may rewrite any of the supplied files
    async fn call(&self, entries: &[RepoEntry]) -> Result<TaskResult, TaskError>;
}

/// A registered task, tagged by capability
pub enum Task {
    File(Box<dyn FileTask>),
    Repo(Box<dyn RepoTask>),
}

impl Task {
    pub fn file(task: impl FileTask + 'static) -> Self {
        Self::File(Box::new(task))
    }

    pub fn repo(task: impl RepoTask + 'static) -> Self {
        Self::Repo(Box::new(task))
    }

    pub fn task_name(&self) -> &str {
        match self {
            Self::File(task) => task.task_name(),
            Self::Repo(task) => task.task_name(),
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(task) => write!(f, "File({})", task.task_name()),
            Self::Repo(task) => write!(f, "Repo({})", task.task_name()),
        }
    }
}

/// Tasks in registration order
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(Task::task_name).collect()
    }

    /// File-scoped tasks, in registration order
    pub fn file_tasks(&self) -> impl Iterator<Item = &dyn FileTask> {
        self.tasks.iter().filter_map(|task| match task {
            Task::File(task) => Some(task.as_ref()),
            Task::Repo(_) => None,
        })
    }

    /// Repository-scoped tasks, in registration order
    pub fn repo_tasks(&self) -> impl Iterator<Item = &dyn RepoTask> {
        self.tasks.iter().filter_map(|task| match task {
            Task::Repo(task) => Some(task.as_ref()),
            Task::File(_) => None,
        })
    }
}

impl FromIterator<Task> for TaskRegistry {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().collect(),
        }
    }
}

/// Builds the task registry for a run from the project configuration
pub trait TaskLoader: Send + Sync {
    fn load(&self, config: &ProjectConfig) -> Result<TaskRegistry, ConfigError>;
}

impl<F> TaskLoader for F
where
    F: Fn(&ProjectConfig) -> Result<TaskRegistry, ConfigError> + Send + Sync,
{
    fn load(&self, config: &ProjectConfig) -> Result<TaskRegistry, ConfigError> {
        self(config)
    }
}
