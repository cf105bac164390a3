use std::path::{Path, PathBuf};

/// One staged file as seen by the tasks.
///
/// Entries are created by the collector and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoEntry {
    file: PathBuf,
    partially_staged: bool,
    git_root: PathBuf,
}

impl RepoEntry {
    pub fn new(file: PathBuf, partially_staged: bool, git_root: PathBuf) -> Self {
        Self {
            file,
            partially_staged,
            git_root,
        }
    }

    /// Absolute path of the staged file
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// The file also has unstaged edits on top of the staged content
    pub fn partially_staged(&self) -> bool {
        self.partially_staged
    }

    /// Absolute root of the repository the file belongs to
    pub fn git_root(&self) -> &Path {
        &self.git_root
    }

    /// Path relative to the repository root, as git reports it
    pub fn relative_path(&self) -> &Path {
        self.file.strip_prefix(&self.git_root).unwrap_or(&self.file)
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        self.file
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_strips_root() {
        let entry = RepoEntry::new(
            PathBuf::from("/repo/src/main.rs"),
            false,
            PathBuf::from("/repo"),
        );

        assert_eq!(entry.relative_path(), Path::new("src/main.rs"));
        assert!(entry.has_extension("rs"));
        assert!(!entry.has_extension("toml"));
    }

    #[test]
    fn test_relative_path_outside_root_is_unchanged() {
        let entry = RepoEntry::new(PathBuf::from("/elsewhere/a.rs"), true, PathBuf::from("/repo"));

        assert_eq!(entry.relative_path(), Path::new("/elsewhere/a.rs"));
        assert!(entry.partially_staged());
    }
}
