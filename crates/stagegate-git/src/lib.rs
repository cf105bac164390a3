//! # stagegate-git
//!
//! Git operations for the stagegate pre-commit runner.
//!
//! This crate answers the handful of questions the hook engine asks the
//! repository before and after running tasks:
//! - Where is the repository root?
//! - Which paths are staged for the next commit?
//! - Which paths have working-tree edits on top of the index?
//! - Stage this path again after a task fixed it.
//!
//! ## Key Types
//!
//! - [`VersionControl`] - The capability consumed by the hook engine
//! - [`GitRepository`] - `git2` implementation of [`VersionControl`]
//! - [`StagingSnapshot`] - Staged and unstaged path sets captured together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stagegate_git::{GitRepository, StagingSnapshot, VersionControl};
//! use std::path::Path;
//!
//! let repo = GitRepository::discover(Path::new("."))?;
//! let snapshot = StagingSnapshot::capture(&repo)?;
//!
//! for path in &snapshot.staged {
//!     println!("{} (partial: {})", path.display(), snapshot.is_partially_staged(path));
//! }
//! ```
//!
//! ## Path Format
//!
//! All paths returned by [`VersionControl`] are relative to the repository
//! root and use the order libgit2 reports them in, which is sorted by path
//! and therefore stable for a given repository state.

mod repo;
mod status;

pub use repo::{GitError, GitRepository, VersionControl};
pub use status::StagingSnapshot;
