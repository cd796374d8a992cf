//! Pull request template discovery.

use std::fs;
use std::path::Path;

use crate::Result;

/// Conventional template locations, checked in order.
pub const PR_TEMPLATE_LOCATIONS: &[&str] = &[
    ".github/pull_request_template.md",
    ".github/PULL_REQUEST_TEMPLATE.md",
    "pull_request_template.md",
    "PULL_REQUEST_TEMPLATE.md",
    "docs/pull_request_template.md",
    "docs/PULL_REQUEST_TEMPLATE.md",
];

/// Contents of the PR template for `workdir`, if there is one.
///
/// An `explicit` path (relative to `workdir`) is used instead of the
/// conventional locations when given.
///
/// # Errors
/// Returns error if a template exists but can't be read, or if `explicit`
/// does not exist.
pub fn find_pr_template(workdir: &Path, explicit: Option<&Path>) -> Result<Option<String>> {
    if let Some(path) = explicit {
        let path = workdir.join(path);
        tracing::debug!(path = %path.display(), "using configured PR template");
        return Ok(Some(fs::read_to_string(path)?));
    }

    for location in PR_TEMPLATE_LOCATIONS {
        let path = workdir.join(location);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "found PR template");
            return Ok(Some(fs::read_to_string(path)?));
        }
    }
    Ok(None)
}
