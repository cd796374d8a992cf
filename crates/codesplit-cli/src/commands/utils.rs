use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use codesplit_core::{CodeOwners, Config, FileOperationStore};
use codesplit_git::Repository;
use codesplit_github::{GhCli, find_pr_template};

use super::BranchFlags;
use crate::output;
use crate::services::BranchOptions;

/// An opened repository with its config and operation store.
pub struct Workspace {
    pub repo: Repository,
    pub workdir: PathBuf,
    pub config: Config,
    pub store: FileOperationStore,
}

/// Helper to open the repository, its config and its operation store.
pub fn open_workspace() -> Result<Workspace> {
    let repo = Repository::open_current().context("Not inside a git repository")?;
    let workdir = repo
        .workdir()
        .context("Cannot run in bare repository")?
        .to_path_buf();
    let config = Config::load_for_workdir(&workdir)
        .with_context(|| format!("Failed to load {}", Config::FILE_NAME))?;
    let store = FileOperationStore::for_workdir(&workdir, &config)?;
    tracing::debug!(
        workdir = %workdir.display(),
        state = %store.dir().display(),
        "opened workspace"
    );

    Ok(Workspace {
        repo,
        workdir,
        config,
        store,
    })
}

/// Ensure the repository is not in detached HEAD state.
/// If detached, prints the detached-HEAD error message and returns an error.
pub fn ensure_on_branch(repo: &Repository) -> Result<()> {
    if repo.head_detached()? {
        output::error_detached_head();
        bail!("");
    }
    Ok(())
}

/// Load the repository's CODEOWNERS file; none at all means nothing is owned.
pub fn load_codeowners(ws: &Workspace) -> Result<CodeOwners> {
    let owners = CodeOwners::locate(&ws.workdir).context("Failed to read CODEOWNERS")?;
    match owners.source() {
        Some(path) => {
            tracing::debug!(path = %path.display(), rules = owners.len(), "loaded CODEOWNERS");
        }
        None => tracing::debug!("no CODEOWNERS file found"),
    }
    Ok(owners)
}

/// Merge CLI flags over the config defaults.
pub fn branch_options(flags: &BranchFlags, ws: &Workspace) -> Result<BranchOptions> {
    let mut options = BranchOptions {
        verify: ws.config.branch.verify && !flags.no_verify,
        push: flags.push,
        remote: flags
            .remote
            .clone()
            .unwrap_or_else(|| ws.config.general.default_remote.clone()),
        upstream: flags.upstream.clone(),
        force: flags.force,
        keep_branch_on_failure: ws.config.branch.keep_branch_on_failure
            || flags.keep_branch_on_failure,
        is_default_owner: false,
        append: flags.append,
        pr: flags.pr,
        draft_pr: flags.draft_pr,
        pr_body: None,
    };

    if options.wants_pr() {
        options.pr_body = find_pr_template(&ws.workdir, ws.config.pr.template.as_deref())
            .context("Failed to read the pull request template")?;
    }
    Ok(options)
}

/// The `gh` client, when pull requests were asked for and `gh` is installed.
pub fn pr_client(ws: &Workspace, options: &BranchOptions) -> Option<GhCli> {
    if !options.wants_pr() {
        return None;
    }
    match GhCli::new(&ws.workdir) {
        Ok(gh) => Some(gh),
        Err(e) => {
            tracing::debug!(error = %e, "GitHub CLI not available");
            None
        }
    }
}
