use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::{GitError, VersionControl};

/// Staged and unstaged paths queried back to back
#[derive(Debug, Clone, Default)]
pub struct StagingSnapshot {
    /// Paths staged for commit, in the order the repository reported them
    pub staged: Vec<PathBuf>,
    /// Paths with working-tree edits not yet in the index
    pub unstaged: HashSet<PathBuf>,
}

impl StagingSnapshot {
    pub fn capture(vcs: &dyn VersionControl) -> Result<Self, GitError> {
        let unstaged = vcs.unstaged_paths()?.into_iter().collect();
        let staged = vcs.staged_paths()?;
        Ok(Self { staged, unstaged })
    }

    /// True if `path` is staged and also carries further unstaged edits.
    pub fn is_partially_staged(&self, path: &Path) -> bool {
        self.unstaged.contains(path)
    }
}
