use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use stagegate_core::{ConfigError, ProjectConfig, Task, TaskLoader, TaskRegistry};
use stagegate_logging::{EventSink, LogEvent, StreamType};

use crate::{
    ClippyConfig, ClippyTask, CommandConfig, CommandTask, FormatConfig, FormatTask,
    OutdatedConfig, OutdatedTask, ProgramRunner,
};

/// Section names accepted under `[tasks]`
pub const TASK_SECTIONS: &[&str] = &[
    FormatTask::NAME,
    ClippyTask::NAME,
    OutdatedTask::NAME,
    "command",
];

/// Builds the built-in tasks from the `[tasks]` sections of `stagegate.toml`.
///
/// Registration order is fixed: format, clippy, the user commands in file
/// order, then outdated.
pub struct DefaultTaskLoader {
    root: PathBuf,
    sink: Arc<dyn EventSink>,
}

impl DefaultTaskLoader {
    /// `root` is the repository root, where repository-wide tools run.
    pub fn new(root: PathBuf, sink: Arc<dyn EventSink>) -> Self {
        Self { root, sink }
    }

    /// Runner whose output lines are forwarded to the sink under `task`.
    fn runner(&self, task: &str) -> ProgramRunner {
        let sink = Arc::clone(&self.sink);
        let task = task.to_string();
        ProgramRunner::new().with_output_callback(Arc::new(
            move |stream: StreamType, line: &str| {
                sink.log(&LogEvent::TaskOutputLine {
                    task: task.clone(),
                    stream,
                    line: line.to_string(),
                });
            },
        ))
    }
}

impl TaskLoader for DefaultTaskLoader {
    fn load(&self, config: &ProjectConfig) -> Result<TaskRegistry, ConfigError> {
        config.check_task_sections(TASK_SECTIONS)?;
        let mut registry = TaskRegistry::new();

        let format: FormatConfig = config.task_section("format")?;
        if format.enabled {
            registry.push(Task::file(FormatTask::new(
                format,
                self.runner(FormatTask::NAME),
            )));
        }

        let clippy: ClippyConfig = config.task_section("clippy")?;
        if clippy.enabled {
            registry.push(Task::repo(ClippyTask::new(
                clippy,
                self.runner(ClippyTask::NAME),
            )));
        }

        let commands: Vec<CommandConfig> = config.task_section("command")?;
        for command in commands {
            let runner = self.runner(&command.name);
            let task = CommandTask::new(command, runner)?;
            debug!(scope = ?task.scope(), "Registering command task");
            registry.push(task.into_task());
        }

        let outdated: OutdatedConfig = config.task_section("outdated")?;
        if outdated.enabled {
            registry.push(Task::repo(OutdatedTask::new(
                outdated,
                self.root.clone(),
                self.runner(OutdatedTask::NAME),
            )));
        }

        debug!(tasks = ?registry.names(), "Loaded built-in tasks");
        Ok(registry)
    }
}
