//! `gh` CLI client.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::traits::PullRequestApi;
use crate::types::{CreatePullRequest, PullRequest};

/// Drives the GitHub CLI inside a working directory.
#[derive(Debug, Clone)]
pub struct GhCli {
    program: PathBuf,
    workdir: PathBuf,
}

impl GhCli {
    /// Locate `gh` on `PATH`.
    ///
    /// # Errors
    /// Returns [`Error::GhNotFound`] if `gh` is not installed.
    pub fn new(workdir: &Path) -> Result<Self> {
        let program = which::which("gh").map_err(|_| Error::GhNotFound)?;
        Ok(Self::with_program(program, workdir))
    }

    /// Use an explicit `gh` binary.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>, workdir: &Path) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.to_path_buf(),
        }
    }

    fn run(&self, command: &str, args: &[&str]) -> Result<String> {
        tracing::debug!(program = %self.program.display(), ?args, "running gh");
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(Error::Spawn)?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: command.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl PullRequestApi for GhCli {
    fn create_pr(&self, pr: &CreatePullRequest) -> Result<PullRequest> {
        let mut args = vec![
            "pr",
            "create",
            "--title",
            pr.title.as_str(),
            "--body",
            pr.body.as_str(),
            "--base",
            pr.base.as_str(),
            "--head",
            pr.head.as_str(),
        ];
        if pr.draft {
            args.push("--draft");
        }
        let stdout = self.run("pr create", &args)?;
        parse_pr_url(&stdout)
    }

    fn default_branch(&self) -> Result<String> {
        let stdout = self.run("repo view", &["repo", "view", "--json", "defaultBranchRef"])?;
        parse_default_branch(&stdout)
    }
}

/// Extract the PR from `gh pr create` output.
///
/// `gh` may print warnings before the URL, so the last URL-looking line is
/// used; the number is its last path segment.
fn parse_pr_url(stdout: &str) -> Result<PullRequest> {
    let url = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| line.starts_with("https://") || line.starts_with("http://"))
        .ok_or_else(|| Error::UnexpectedOutput(stdout.to_string()))?;

    let number = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| Error::UnexpectedOutput(url.to_string()))?;

    Ok(PullRequest {
        number,
        url: url.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoView {
    default_branch_ref: Option<BranchRef>,
}

#[derive(Deserialize)]
struct BranchRef {
    name: String,
}

fn parse_default_branch(stdout: &str) -> Result<String> {
    let view: RepoView = serde_json::from_str(stdout)?;
    view.default_branch_ref
        .map(|r| r.name)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::UnexpectedOutput(stdout.to_string()))
}
