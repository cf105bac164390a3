mod init;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use stagegate_core::{HookResult, Hooks, HooksConfig};
use stagegate_git::{GitRepository, VersionControl};
use stagegate_logging::{init_tracing, EventSink, LogFormat, Logger};
use stagegate_tasks::DefaultTaskLoader;

/// Process exit code for runs that failed before producing a result
const ERROR_EXIT_CODE: i32 = 4;

#[derive(Parser, Debug)]
#[command(
    name = "stagegate",
    about = "Runs formatters and linters over staged files before a commit",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the hooks over the staged files (default)
    Run(RunArgs),
    /// Write a default stagegate.toml at the repository root
    Init {
        /// Directory inside the repository (default: current directory)
        #[arg(short = 'd', long)]
        directory: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Directory to scan; only staged files below it are checked
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,

    /// Configuration file (default: <git root>/stagegate.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep checking after a task rejects a file
    #[arg(long)]
    continue_on_rejected: bool,

    /// Status output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Diagnostic log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Also append status events as JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the final result as JSON on stdout
    #[arg(long)]
    json_output: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Final result as printed by `--json-output`
#[derive(Debug, Serialize)]
struct RunSummary {
    result: HookResult,
    code: i32,
    success: bool,
}

impl From<HookResult> for RunSummary {
    fn from(result: HookResult) -> Self {
        Self {
            result,
            code: result.code(),
            success: result.is_success(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let outcome = match cli.command {
        Some(Command::Init { directory, force }) => init::handle_init(directory, force).map(|_| 0),
        Some(Command::Run(args)) => run(args).await,
        None => run(cli.run).await,
    };

    let code = match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".bright_red().bold(), e);
            ERROR_EXIT_CODE
        }
    };

    std::process::exit(code);
}

async fn run(args: RunArgs) -> Result<i32> {
    let log_format: LogFormat = args.log_format.into();
    init_tracing(&args.log_level, log_format);

    let working_dir = match args.directory {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let logger = match &args.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };
    let sink: Arc<dyn EventSink> = Arc::new(logger);

    let vcs = GitRepository::discover(&working_dir)?;
    let loader = DefaultTaskLoader::new(vcs.root().to_path_buf(), Arc::clone(&sink));

    let mut config = HooksConfig::new().with_continue_on_rejected(args.continue_on_rejected);
    if let Some(path) = args.config {
        config = config.with_config_path(path);
    }

    let hooks = Hooks::new(Arc::new(vcs), Arc::new(loader), sink, working_dir, config);
    let result = hooks.run().await?;

    if args.json_output {
        let json = serde_json::to_string_pretty(&RunSummary::from(result))?;
        println!("{}", json);
    } else {
        print_result(result);
    }

    Ok(result.code())
}

fn print_result(result: HookResult) {
    match result {
        HookResult::Clean => {}
        HookResult::HasChanges => {
            eprintln!("{} Files were fixed and re-staged.", "✓".bright_green());
        }
        HookResult::HasUnstagedChanges => {
            eprintln!(
                "{} Files were fixed but also have unstaged changes; review and stage them manually.",
                "⚠".bright_yellow()
            );
        }
        HookResult::Rejected => {
            eprintln!("{} Commit rejected.", "✗".bright_red());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_uses_top_level_run_args() {
        let cli = Cli::try_parse_from([
            "stagegate",
            "--continue-on-rejected",
            "--log-format",
            "json",
            "-d",
            "crates",
        ])
        .unwrap();

        assert!(cli.command.is_none());
        assert!(cli.run.continue_on_rejected);
        assert!(matches!(cli.run.log_format, LogFormatChoice::Json));
        assert_eq!(cli.run.directory, Some(PathBuf::from("crates")));
        assert_eq!(cli.run.log_level, "warn");
    }

    #[test]
    fn test_run_subcommand_parses_its_own_args() {
        let cli = Cli::try_parse_from(["stagegate", "run", "--json-output", "--config", "x.toml"])
            .unwrap();

        match cli.command {
            Some(Command::Run(args)) => {
                assert!(args.json_output);
                assert_eq!(args.config, Some(PathBuf::from("x.toml")));
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_init_force_flag() {
        let cli = Cli::try_parse_from(["stagegate", "init", "--force"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Init { force: true, .. })));
    }

    #[test]
    fn test_summary_json_shape() {
        let json = serde_json::to_value(RunSummary::from(HookResult::HasUnstagedChanges)).unwrap();

        assert_eq!(json["result"], "has_unstaged_changes");
        assert_eq!(json["code"], 2);
        assert_eq!(json["success"], false);
    }
}
