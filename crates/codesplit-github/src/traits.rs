//! Trait abstraction for pull request operations.
//!
//! Services depend on `PullRequestApi` rather than on `GhCli` so PR creation
//! can be mocked in tests.

use crate::{CreatePullRequest, PullRequest, Result};

/// Pull request operations against the repository's GitHub remote.
///
/// Calls are blocking.
#[allow(clippy::missing_errors_doc)]
pub trait PullRequestApi {
    /// Open a pull request.
    fn create_pr(&self, pr: &CreatePullRequest) -> Result<PullRequest>;

    /// Name of the repository's default branch on GitHub.
    fn default_branch(&self) -> Result<String>;
}
