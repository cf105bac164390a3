//! # stagegate-tasks
//!
//! Built-in tasks for the stagegate hook engine and the loader that
//! registers them from `stagegate.toml`.
//!
//! ## Tasks
//!
//! - [`FormatTask`] - `rustfmt` on each staged `.rs` file
//! - [`ClippyTask`] - one `cargo clippy` run, rejecting lints in staged files
//! - [`CommandTask`] - user-defined commands, per file or per commit
//! - [`OutdatedTask`] - `cargo outdated` on every commit

mod clippy;
mod command;
mod digest;
mod format;
mod loader;
mod outdated;
mod output;
mod runner;

pub use clippy::{parse_diagnostics, ClippyConfig, ClippyTask, Diagnostic};
pub use command::{CommandConfig, CommandScope, CommandTask};
pub use format::{FormatConfig, FormatTask};
pub use loader::{DefaultTaskLoader, TASK_SECTIONS};
pub use outdated::{parse_report, OutdatedConfig, OutdatedDependency, OutdatedLevel, OutdatedTask};
pub use output::ProgramOutput;
pub use runner::{OutputCallback, ProgramRunner};
