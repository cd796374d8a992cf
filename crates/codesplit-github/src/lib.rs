//! # codesplit-github
//!
//! Pull request creation for codesplit. Requests go through the `gh` CLI so
//! the user's existing GitHub authentication is reused as is.

mod client;
mod error;
mod template;
mod traits;
mod types;

pub use client::GhCli;
pub use error::{Error, Result};
pub use template::{PR_TEMPLATE_LOCATIONS, find_pr_template};
pub use traits::PullRequestApi;
pub use types::{CreatePullRequest, PullRequest};
