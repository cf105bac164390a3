use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of a single task invocation.
///
/// Ordered `Accepted < Modified < Rejected`; combining verdicts keeps the
/// most severe one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskResult {
    /// Nothing to report
    #[default]
    Accepted,
    /// The task fixed the file(s) in place
    Modified,
    /// The task found a problem it cannot fix
    Rejected,
}

impl TaskResult {
    /// Join of the two verdicts: whichever is more severe.
    pub fn raise_to(self, other: Self) -> Self {
        self.max(other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Modified => "modified",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for TaskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of a hook run.
///
/// The discriminants double as process exit codes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum HookResult {
    /// All tasks accepted every staged file
    #[default]
    Clean = 0,
    /// Files were fixed and re-staged
    HasChanges = 1,
    /// Files were fixed but could not be re-staged safely
    HasUnstagedChanges = 2,
    /// At least one task rejected the commit
    Rejected = 3,
}

impl HookResult {
    /// Join of the two results: whichever is more severe.
    pub fn raise_to(self, other: Self) -> Self {
        self.max(other)
    }

    /// Join every result in `results`, starting from [`HookResult::Clean`].
    pub fn join<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        results.into_iter().fold(Self::Clean, Self::raise_to)
    }

    /// The commit may proceed.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Clean | Self::HasChanges)
    }

    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::HasChanges => "has_changes",
            Self::HasUnstagedChanges => "has_unstaged_changes",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for HookResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
