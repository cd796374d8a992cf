//! Error types for codesplit-github.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to GitHub through `gh`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The `gh` binary is not on `PATH`.
    #[error("GitHub CLI not found - install it from https://cli.github.com and run `gh auth login`")]
    GhNotFound,

    /// `gh` could not be started.
    #[error("failed to run gh: {0}")]
    Spawn(#[source] std::io::Error),

    /// `gh` exited non-zero.
    #[error("`gh {command}` failed: {message}")]
    CommandFailed {
        /// Subcommand that failed, e.g. `pr create`.
        command: String,
        /// Trimmed stderr.
        message: String,
    },

    /// `gh` output could not be understood.
    #[error("unexpected gh output: {0}")]
    UnexpectedOutput(String),

    /// JSON parsing error.
    #[error("failed to parse gh response: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error (e.g. reading a PR template).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
