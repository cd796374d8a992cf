//! Error types for codesplit-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository, or the repository has no working tree.
    #[error("not a git repository")]
    NotARepository,

    /// Branch not found.
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// A git subprocess exited unsuccessfully.
    #[error("`{command}` failed: {message}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Trimmed stderr (or stdout when stderr was empty).
        message: String,
    },

    /// Push failed.
    #[error("push failed: {0}")]
    PushFailed(String),

    /// The git binary could not be started.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// The command line that was attempted.
        command: String,
        /// Underlying spawn error.
        source: std::io::Error,
    },

    /// IO error while touching the working tree.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}
