//! Pull request types.

use serde::{Deserialize, Serialize};

/// Request to create a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePullRequest {
    /// PR title.
    pub title: String,

    /// PR body.
    pub body: String,

    /// Head branch.
    pub head: String,

    /// Base branch.
    pub base: String,

    /// Whether to create as draft.
    pub draft: bool,
}

/// A created pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number.
    pub number: u64,

    /// PR URL.
    pub url: String,
}
