//! # stagegate-core
//!
//! The hook engine: collects staged files, runs file and repository tasks
//! over them in registration order and folds their verdicts into a single
//! [`HookResult`].

mod collector;
pub mod config;
mod entry;
mod error;
mod hooks;
mod result;
pub mod task;

pub use collector::StagedFileCollector;
pub use config::{ConfigError, HooksConfig, ProjectConfig, CONFIG_FILE_NAME};
pub use entry::RepoEntry;
pub use error::HookError;
pub use hooks::Hooks;
pub use result::{HookResult, TaskResult};
pub use task::{FileTask, RepoTask, Task, TaskError, TaskLoader, TaskRegistry};
