use git2::{Diff, DiffOptions, ErrorCode, Repository};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepo(String),

    #[error("Repository has no working directory: {0}")]
    BareRepository(String),

    #[error("Git operation failed: {0}")]
    GitOperationFailed(#[from] git2::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Repository queries and mutations consumed by the hook engine.
///
/// Paths are relative to [`VersionControl::root`].
pub trait VersionControl: Send + Sync {
    /// Absolute, symlink-resolved root of the working tree.
    fn root(&self) -> &Path;

    /// Paths whose working-tree content differs from the index.
    fn unstaged_paths(&self) -> Result<Vec<PathBuf>, GitError>;

    /// Paths whose index content differs from `HEAD`.
    fn staged_paths(&self) -> Result<Vec<PathBuf>, GitError>;

    /// Add the current working-tree content of `path` to the index.
    fn stage(&self, path: &Path) -> Result<(), GitError>;
}

/// `git2` backed repository handle.
///
/// Only the root is kept; the repository is reopened per query so the handle
/// stays `Send + Sync` and every query sees the on-disk index.
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    /// Find the repository containing `working_dir`.
    pub fn discover(working_dir: &Path) -> Result<Self, GitError> {
        let repo = Repository::discover(working_dir).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                GitError::NotARepo(working_dir.display().to_string())
            } else {
                GitError::GitOperationFailed(e)
            }
        })?;

        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::BareRepository(repo.path().display().to_string()))?;
        let root = std::fs::canonicalize(workdir)?;

        debug!(root = %root.display(), "Discovered git repository");

        Ok(Self { root })
    }

    fn open(&self) -> Result<Repository, GitError> {
        Ok(Repository::open(&self.root)?)
    }

    fn delta_paths(diff: &Diff<'_>) -> Vec<PathBuf> {
        diff.deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(Path::to_path_buf)
            })
            .collect()
    }
}

impl VersionControl for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn unstaged_paths(&self) -> Result<Vec<PathBuf>, GitError> {
        let repo = self.open()?;

        let mut opts = DiffOptions::new();
        opts.include_untracked(false);

        let diff = repo.diff_index_to_workdir(None, Some(&mut opts))?;
        let paths = Self::delta_paths(&diff);

        debug!(count = paths.len(), "Listed unstaged paths");
        Ok(paths)
    }

    fn staged_paths(&self) -> Result<Vec<PathBuf>, GitError> {
        let repo = self.open()?;

        // An unborn branch diffs against the empty tree
        let head_tree = match repo.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                None
            }
            Err(e) => return Err(GitError::GitOperationFailed(e)),
        };

        let index = repo.index()?;
        let mut opts = DiffOptions::new();
        let diff = repo.diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut opts))?;
        let paths = Self::delta_paths(&diff);

        debug!(count = paths.len(), "Listed staged paths");
        Ok(paths)
    }

    fn stage(&self, path: &Path) -> Result<(), GitError> {
        let repo = self.open()?;
        let mut index = repo.index()?;
        index.add_path(path)?;
        index.write()?;

        debug!(path = %path.display(), "Staged path");
        Ok(())
    }
}
