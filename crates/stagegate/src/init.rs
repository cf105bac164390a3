//! Writes a starter `stagegate.toml` at the repository root.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use stagegate_core::CONFIG_FILE_NAME;
use stagegate_git::{GitRepository, VersionControl};

pub const DEFAULT_CONFIG: &str = r#"# stagegate configuration
#
# Set to false to skip every check.
enabled = true

# Regexes matched against the whole path of each staged file, relative to
# the directory stagegate runs in.
exclude = []

[tasks.format]
enabled = true
edition = "2021"

[tasks.clippy]
enabled = true
# Extra arguments after `cargo clippy --message-format=short`
args = []

[tasks.outdated]
enabled = false
# major | minor | patch | any
level = "major"
allowed = []

# User-defined commands run after clippy, in the order listed.
#
# [[tasks.command]]
# name = "taplo"
# program = "taplo"
# args = ["fmt"]
# pattern = ".*\\.toml"
# scope = "file"      # file | repository
# fixes = true
"#;

pub fn handle_init(directory: Option<PathBuf>, force: bool) -> Result<()> {
    let working_dir = match directory {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let repo = GitRepository::discover(&working_dir)?;
    let path = write_default_config(repo.root(), force)?;

    eprintln!(
        "{} Wrote {}",
        "✓".bright_green(),
        path.display().to_string().bright_cyan()
    );
    Ok(())
}

/// Write [`DEFAULT_CONFIG`] into `root`, refusing to replace an existing
/// file unless `force` is set.
pub fn write_default_config(root: &Path, force: bool) -> Result<PathBuf> {
    let path = root.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; use --force to overwrite it",
            path.display()
        );
    }

    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
