use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use stagegate_git::{GitError, StagingSnapshot, VersionControl};

use crate::{HookError, RepoEntry};

/// Turns the repository's staged paths into [`RepoEntry`] values.
///
/// Only files that still exist, live under the scan directory and match no
/// exclude pattern become entries.
pub struct StagedFileCollector<'a> {
    vcs: &'a dyn VersionControl,
    scan_dir: PathBuf,
    exclude: &'a [Regex],
}

impl<'a> StagedFileCollector<'a> {
    /// `scan_dir` is resolved through symlinks so it compares exactly with
    /// the (already resolved) repository root.
    pub fn new(
        vcs: &'a dyn VersionControl,
        scan_dir: &Path,
        exclude: &'a [Regex],
    ) -> Result<Self, HookError> {
        let scan_dir =
            std::fs::canonicalize(scan_dir).map_err(|source| HookError::WorkingDir {
                path: scan_dir.display().to_string(),
                source,
            })?;

        Ok(Self {
            vcs,
            scan_dir,
            exclude,
        })
    }

    /// Query git once and yield entries lazily in the order git reported the
    /// staged paths.
    pub fn collect(&self) -> Result<impl Iterator<Item = RepoEntry> + '_, GitError> {
        let mut snapshot = StagingSnapshot::capture(self.vcs)?;
        let staged = std::mem::take(&mut snapshot.staged);
        let git_root = self.vcs.root().to_path_buf();

        debug!(
            staged = staged.len(),
            unstaged = snapshot.unstaged.len(),
            scan_dir = %self.scan_dir.display(),
            "Collecting staged files"
        );

        Ok(staged
            .into_iter()
            .filter_map(move |path| self.resolve(&git_root, &path, &snapshot)))
    }

    fn resolve(
        &self,
        git_root: &Path,
        relative: &Path,
        snapshot: &StagingSnapshot,
    ) -> Option<RepoEntry> {
        let file = git_root.join(relative);

        // Deleted after staging
        if !file.is_file() {
            trace!(path = %relative.display(), "Skipping missing file");
            return None;
        }

        let Ok(in_scan_dir) = file.strip_prefix(&self.scan_dir) else {
            trace!(path = %relative.display(), "Skipping file outside scan directory");
            return None;
        };

        let match_path = to_slash(in_scan_dir);
        if self.exclude.iter().any(|re| re.is_match(&match_path)) {
            debug!(path = %match_path, "Skipping excluded file");
            return None;
        }

        Some(RepoEntry::new(
            file,
            snapshot.is_partially_staged(relative),
            git_root.to_path_buf(),
        ))
    }
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
