use thiserror::Error;

use crate::config::ConfigError;
use crate::task::TaskError;

#[derive(Error, Debug)]
pub enum HookError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Git error: {0}")]
    Git(#[from] stagegate_git::GitError),

    #[error("Task '{task}' failed: {source}")]
    Task {
        task: String,
        #[source]
        source: TaskError,
    },

    #[error("Cannot resolve working directory {path}: {source}")]
    WorkingDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
