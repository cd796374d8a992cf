//! Trait abstractions for git operations.
//!
//! `GitOps` is the only way the service layer touches the repository. The
//! working tree, the index and the current-branch pointer are shared mutable
//! state, so every call is synchronous and callers never issue them
//! concurrently.

use std::path::Path;

use git2::Oid;

use crate::{PushOptions, Result};

/// Trait for git repository operations.
///
/// Implemented by [`crate::Repository`] for real repositories and by mocks in
/// the CLI's service tests.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Repository Info ===

    /// Get the working directory path.
    fn workdir(&self) -> Option<&Path>;

    /// Get the current branch name.
    ///
    /// Returns an error if HEAD is detached or not on a branch.
    fn current_branch(&self) -> Result<String>;

    /// Check if HEAD is detached.
    fn head_detached(&self) -> Result<bool>;

    /// Detect the default branch (remote HEAD, then main/master).
    fn detect_default_branch(&self) -> Option<String>;

    // === Branch Operations ===

    /// Check if a local branch exists.
    fn branch_exists(&self, name: &str) -> bool;

    /// Create a new branch at the current HEAD without switching to it.
    fn create_branch(&self, name: &str) -> Result<Oid>;

    /// Switch the working tree to a branch, carrying uncommitted changes.
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Delete a local branch regardless of merge status.
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// List all local branches.
    fn list_branches(&self) -> Result<Vec<String>>;

    // === Working Tree ===

    /// Paths with unstaged working-tree changes, including untracked files.
    fn changed_files(&self) -> Result<Vec<String>>;

    /// Paths with staged changes relative to HEAD.
    fn staged_files(&self) -> Result<Vec<String>>;

    /// Stage exactly the given paths (additions, modifications and deletions).
    fn stage_files(&self, files: &[String]) -> Result<()>;

    /// Unstage the given paths, leaving their working-tree content alone.
    fn unstage_files(&self, files: &[String]) -> Result<()>;

    /// Commit the index. When `verify` is false, commit hooks are skipped.
    fn commit(&self, message: &str, verify: bool) -> Result<()>;

    /// Bring `files` back from `branch` into the working tree as unstaged changes.
    fn restore_files_from(&self, branch: &str, files: &[String]) -> Result<()>;

    // === Remote Operations ===

    /// Push a branch, streaming git's output to the terminal.
    fn push(&self, options: &PushOptions<'_>) -> Result<()>;
}
