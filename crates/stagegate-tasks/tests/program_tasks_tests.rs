//! Tasks driving real programs through `sh`.
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use stagegate_core::{FileTask, RepoEntry, RepoTask, TaskError, TaskResult};
use stagegate_logging::{EventSink, LogEvent, StreamType};
use stagegate_tasks::{
    ClippyConfig, ClippyTask, CommandConfig, CommandScope, CommandTask, FormatConfig, FormatTask,
    ProgramRunner,
};
use tempfile::TempDir;

fn repo_with(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

fn entry(root: &Path, name: &str) -> RepoEntry {
    RepoEntry::new(root.join(name), false, root.to_path_buf())
}

fn sh_command(script: &str, scope: CommandScope, fixes: bool) -> CommandTask {
    CommandTask::new(
        CommandConfig {
            name: "script".to_string(),
            program: "sh".to_string(),
            // `sh -c script name files...` binds the files to $1..
            args: vec!["-c".to_string(), script.to_string(), "script".to_string()],
            pattern: None,
            scope,
            fixes,
            timeout_secs: Some(10),
        },
        ProgramRunner::new(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_file_command_accepts_on_success() {
    let dir = repo_with(&[("a.txt", "a\n")]);
    let task = sh_command("test -f \"$1\"", CommandScope::File, false);

    let result = FileTask::call(&task, &entry(dir.path(), "a.txt")).await.unwrap();

    assert_eq!(result, TaskResult::Accepted);
}

#[tokio::test]
async fn test_file_command_rejects_on_failure() {
    let dir = repo_with(&[("a.txt", "TODO\n")]);
    let task = sh_command("! grep -q TODO \"$1\"", CommandScope::File, false);

    let result = FileTask::call(&task, &entry(dir.path(), "a.txt")).await.unwrap();

    assert_eq!(result, TaskResult::Rejected);
}

#[tokio::test]
async fn test_fixing_command_reports_modification() {
    let dir = repo_with(&[("a.txt", "messy\n")]);
    let task = sh_command("printf 'tidy\\n' > \"$1\"", CommandScope::File, true);

    let result = FileTask::call(&task, &entry(dir.path(), "a.txt")).await.unwrap();

    assert_eq!(result, TaskResult::Modified);
    assert_eq!(fs::read_to_string(dir.path().join("a.txt")).unwrap(), "tidy\n");
}

#[tokio::test]
async fn test_fixing_command_without_change_is_accepted() {
    let dir = repo_with(&[("a.txt", "tidy\n")]);
    let task = sh_command("printf 'tidy\\n' > \"$1\"", CommandScope::File, true);

    let result = FileTask::call(&task, &entry(dir.path(), "a.txt")).await.unwrap();

    assert_eq!(result, TaskResult::Accepted);
}

#[tokio::test]
async fn test_repository_command_receives_every_relative_path() {
    let dir = repo_with(&[("a.txt", ""), ("sub/b.txt", "")]);
    let task = sh_command(
        "test \"$1\" = a.txt && test \"$2\" = sub/b.txt && test $# -eq 2",
        CommandScope::Repository,
        false,
    );

    let entries = vec![entry(dir.path(), "a.txt"), entry(dir.path(), "sub/b.txt")];
    let result = RepoTask::call(&task, &entries).await.unwrap();

    assert_eq!(result, TaskResult::Accepted);
}

#[tokio::test]
async fn test_repository_fix_of_any_file_is_modification() {
    let dir = repo_with(&[("a.txt", "x\n"), ("b.txt", "y\n")]);
    let task = sh_command("echo z >> \"$2\"", CommandScope::Repository, true);

    let entries = vec![entry(dir.path(), "a.txt"), entry(dir.path(), "b.txt")];
    let result = RepoTask::call(&task, &entries).await.unwrap();

    assert_eq!(result, TaskResult::Modified);
}

/// Executable standing in for rustfmt; it receives the source on stdin.
fn fake_formatter(dir: &Path, name: &str, script: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn format_task(program: String) -> FormatTask {
    FormatTask::new(
        FormatConfig {
            program,
            ..FormatConfig::default()
        },
        ProgramRunner::new(),
    )
}

#[tokio::test]
async fn test_formatter_exit_status_decides_rejection() {
    let dir = repo_with(&[("src/lib.rs", "fn main() {}\n")]);
    let file = entry(dir.path(), "src/lib.rs");
    let tools = TempDir::new().unwrap();

    let ok = format_task(fake_formatter(tools.path(), "identity", "cat"));
    let broken = format_task(fake_formatter(tools.path(), "unparsable", "cat >/dev/null; exit 1"));

    assert_eq!(ok.call(&file).await.unwrap(), TaskResult::Accepted);
    assert_eq!(broken.call(&file).await.unwrap(), TaskResult::Rejected);
    assert_eq!(
        fs::read_to_string(dir.path().join("src/lib.rs")).unwrap(),
        "fn main() {}\n"
    );
}

#[tokio::test]
async fn test_formatter_output_replaces_only_the_staged_file() {
    let dir = repo_with(&[
        ("src/lib.rs", "mod child;\nfn   messy( ){}\n"),
        ("src/child.rs", "fn   messy( ){}\n"),
    ]);
    let tools = TempDir::new().unwrap();
    let task = format_task(fake_formatter(
        tools.path(),
        "tidy",
        "sed 's/fn   messy( ){}/fn messy() {}/'",
    ));

    let result = task.call(&entry(dir.path(), "src/lib.rs")).await.unwrap();

    assert_eq!(result, TaskResult::Modified);
    assert_eq!(
        fs::read_to_string(dir.path().join("src/lib.rs")).unwrap(),
        "mod child;\nfn messy() {}\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("src/child.rs")).unwrap(),
        "fn   messy( ){}\n"
    );
}

fn rustfmt_available() -> bool {
    std::process::Command::new("rustfmt")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

#[tokio::test]
async fn test_rustfmt_leaves_unstaged_child_modules_alone() {
    if !rustfmt_available() {
        eprintln!("rustfmt not installed, skipping");
        return;
    }

    let dir = repo_with(&[
        ("src/lib.rs", "mod child;\n"),
        ("src/child.rs", "fn   messy( ){}"),
    ]);
    let task = FormatTask::new(FormatConfig::default(), ProgramRunner::new());

    let result = task.call(&entry(dir.path(), "src/lib.rs")).await.unwrap();

    assert_eq!(result, TaskResult::Accepted);
    assert_eq!(
        fs::read_to_string(dir.path().join("src/child.rs")).unwrap(),
        "fn   messy( ){}"
    );
}

#[tokio::test]
async fn test_rustfmt_rewrites_messy_staged_file() {
    if !rustfmt_available() {
        eprintln!("rustfmt not installed, skipping");
        return;
    }

    let dir = repo_with(&[("src/lib.rs", "fn   messy( ){}")]);
    let task = FormatTask::new(FormatConfig::default(), ProgramRunner::new());

    let result = task.call(&entry(dir.path(), "src/lib.rs")).await.unwrap();

    assert_eq!(result, TaskResult::Modified);
    assert_eq!(
        fs::read_to_string(dir.path().join("src/lib.rs")).unwrap(),
        "fn messy() {}\n"
    );
}

#[tokio::test]
async fn test_clippy_without_manifest_is_an_error() {
    let dir = repo_with(&[("a.rs", "fn main() {}\n")]);
    let task = ClippyTask::new(ClippyConfig::default(), ProgramRunner::new());

    let result = RepoTask::call(&task, &[entry(dir.path(), "a.rs")]).await;

    assert!(
        matches!(result, Err(TaskError::InvalidOutput(_))),
        "cargo failing without diagnostics must not pass the commit: {:?}",
        result
    );
}

#[derive(Default)]
struct Lines(Mutex<Vec<(String, StreamType, String)>>);

impl EventSink for Lines {
    fn log(&self, event: &LogEvent) {
        if let LogEvent::TaskOutputLine { task, stream, line } = event {
            self.0
                .lock()
                .unwrap()
                .push((task.clone(), *stream, line.clone()));
        }
    }
}

#[tokio::test]
async fn test_loader_forwards_program_output_to_sink() {
    use stagegate_core::{ProjectConfig, TaskLoader};
    use stagegate_tasks::DefaultTaskLoader;

    let dir = repo_with(&[("a.txt", "")]);
    let config: ProjectConfig = r#"
[tasks.format]
enabled = false

[tasks.clippy]
enabled = false

[[tasks.command]]
name = "shout"
program = "sh"
args = ["-c", "echo hello; echo oops >&2", "shout"]
"#
    .parse()
    .unwrap();

    let lines = Arc::new(Lines::default());
    let loader = DefaultTaskLoader::new(dir.path().to_path_buf(), lines.clone());
    let registry = loader.load(&config).unwrap();

    let task = registry.file_tasks().next().unwrap();
    task.call(&entry(dir.path(), "a.txt")).await.unwrap();

    assert_eq!(
        *lines.0.lock().unwrap(),
        vec![
            ("shout".to_string(), StreamType::Stdout, "hello".to_string()),
            ("shout".to_string(), StreamType::Stderr, "oops".to_string()),
        ]
    );
}
