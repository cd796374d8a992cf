//! Error types for codesplit-core.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in codesplit-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a Git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepository,

    /// Invalid branch name.
    #[error("invalid branch name '{name}': {reason}")]
    InvalidBranchName {
        /// The invalid name.
        name: String,
        /// Why the name is invalid.
        reason: String,
    },

    /// Two owners sanitize to the same branch name.
    #[error("owners {} would all use branch '{branch}'", .owners.join(", "))]
    BranchNameCollision {
        /// The shared branch name.
        branch: String,
        /// The owners that collide.
        owners: Vec<String>,
    },

    /// The index already holds staged changes.
    #[error(
        "staged changes found in: {}\nunstage them first with `git restore --staged .`",
        .files.join(", ")
    )]
    StagedChanges {
        /// Paths currently staged.
        files: Vec<String>,
    },

    /// Missing or conflicting command options.
    #[error("{0}")]
    InvalidOptions(String),

    /// Invalid owner filter pattern.
    #[error("invalid owner pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// No record with the given id exists.
    #[error("operation not found: {0}")]
    OperationNotFound(String),

    /// The per-user state directory could not be determined.
    #[error("cannot determine a state directory - set CODESPLIT_STATE_DIR")]
    NoStateDir,

    /// State file parsing error.
    #[error("failed to parse {file}: {message}")]
    StateParseError {
        /// The unreadable file.
        file: PathBuf,
        /// Parser message.
        message: String,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(#[from] codesplit_git::Error),
}
