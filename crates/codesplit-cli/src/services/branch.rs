//! Branch service: put one owner's changed files on one branch.
//!
//! The stages are creating-branch, committing, pushing and creating-pr, each
//! written to the operation record before it runs. Whatever happens, the
//! caller is back on the original branch when [`BranchService::execute`]
//! returns, and files committed to a branch that gets rolled back are first
//! restored into the working tree.

use anyhow::{Context, Result, bail};
use codesplit_core::{
    BranchName, BranchPatch, Error as CoreError, OperationKind, OperationOptions, OperationStore,
    OwnerResolver, OwnershipMap, Stage,
};
use codesplit_git::{GitOps, PushOptions};
use codesplit_github::{CreatePullRequest, PullRequest, PullRequestApi};

/// Flags shared by `branch` and `multi-branch`.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)] // CLI flags map directly to fields
pub struct BranchOptions {
    pub verify: bool,
    pub push: bool,
    pub remote: String,
    pub upstream: Option<String>,
    pub force: bool,
    pub keep_branch_on_failure: bool,
    /// Fold files no CODEOWNERS rule owns into this owner's branch.
    pub is_default_owner: bool,
    pub append: bool,
    pub pr: bool,
    pub draft_pr: bool,
    /// PR body, usually the repository's PR template.
    pub pr_body: Option<String>,
}

impl Default for BranchOptions {
    fn default() -> Self {
        Self {
            verify: true,
            push: false,
            remote: "origin".to_string(),
            upstream: None,
            force: false,
            keep_branch_on_failure: false,
            is_default_owner: false,
            append: false,
            pr: false,
            draft_pr: false,
            pr_body: None,
        }
    }
}

impl BranchOptions {
    /// Check flag combinations.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidOptions`] when `--pr` and `--draft-pr` are
    /// combined or either is used without `--push`.
    pub fn validate(&self) -> std::result::Result<(), CoreError> {
        if self.pr && self.draft_pr {
            return Err(CoreError::InvalidOptions(
                "--pr and --draft-pr cannot be used together".into(),
            ));
        }
        if self.wants_pr() && !self.push {
            return Err(CoreError::InvalidOptions(
                "--pr and --draft-pr require --push".into(),
            ));
        }
        Ok(())
    }

    /// Whether a pull request should be opened after pushing.
    #[must_use]
    pub const fn wants_pr(&self) -> bool {
        self.pr || self.draft_pr
    }

    /// The flags as stored in the operation record.
    #[must_use]
    pub fn snapshot(&self) -> OperationOptions {
        OperationOptions {
            verify: self.verify,
            push: self.push,
            remote: Some(self.remote.clone()),
            upstream: self.upstream.clone(),
            force: self.force,
            keep_branch_on_failure: self.keep_branch_on_failure,
            append: self.append,
            pr: self.pr,
            draft_pr: self.draft_pr,
        }
    }
}

/// One owner's branch to produce.
#[derive(Debug, Clone, Copy)]
pub struct BranchRequest<'a> {
    pub owner: &'a str,
    pub branch_name: &'a BranchName,
    pub commit_message: &'a str,
}

impl BranchRequest<'_> {
    /// Reject a blank owner or commit message.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidOptions`] naming the missing input.
    pub fn validate(&self) -> std::result::Result<(), CoreError> {
        if self.owner.trim().is_empty() {
            return Err(CoreError::InvalidOptions("an owner is required".into()));
        }
        if self.commit_message.trim().is_empty() {
            return Err(CoreError::InvalidOptions("a commit message is required".into()));
        }
        Ok(())
    }
}

/// How an owner's branch operation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    Succeeded,
    /// The owner has no changed files; nothing was done.
    Skipped,
    /// A precondition failed before anything was touched.
    Rejected(String),
    /// A git step failed and the branch was rolled back as far as possible.
    Failed(String),
}

/// What rollback left behind after a failed branch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    /// The new branch was deleted, after restoring its files when it had a commit.
    Deleted { restored: bool },
    /// The new branch was kept because of `--keep-branch-on-failure`.
    Kept { restored: bool },
    /// Files could not be restored, so the branch holding them was kept.
    RestoreFailed(String),
    /// Deleting the branch failed after its files were safe.
    DeleteFailed(String),
    /// The branch existed before the operation and was left as is.
    Existing,
    /// Returning to the original branch failed; the branch was left alone.
    CheckoutFailed(String),
}

/// Result of one owner's branch operation.
#[derive(Debug, Clone)]
pub struct BranchResult {
    pub branch_name: String,
    pub owner: String,
    /// Files put on the branch.
    pub files: Vec<String>,
    /// The subset of `files` attributed only through the default owner.
    pub default_files: Vec<String>,
    pub pushed: bool,
    pub pr: Option<PullRequest>,
    /// PR creation failure; never fails the branch itself.
    pub pr_error: Option<String>,
    pub outcome: BranchOutcome,
    pub cleanup: Option<Cleanup>,
    /// Earlier owner branches that already took this owner's co-owned files.
    pub claimed_by: Vec<String>,
}

impl BranchResult {
    fn new(request: &BranchRequest<'_>, files: Vec<String>, default_files: Vec<String>) -> Self {
        Self {
            branch_name: request.branch_name.to_string(),
            owner: request.owner.to_string(),
            files,
            default_files,
            pushed: false,
            pr: None,
            pr_error: None,
            outcome: BranchOutcome::Skipped,
            cleanup: None,
            claimed_by: Vec::new(),
        }
    }

    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.outcome, BranchOutcome::Succeeded)
    }

    #[must_use]
    pub const fn skipped(&self) -> bool {
        matches!(self.outcome, BranchOutcome::Skipped)
    }

    /// Failure message for rejected and failed operations.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            BranchOutcome::Rejected(msg) | BranchOutcome::Failed(msg) => Some(msg),
            BranchOutcome::Succeeded | BranchOutcome::Skipped => None,
        }
    }
}

/// A standalone `branch` run: the result plus the record left behind, if any.
#[derive(Debug)]
pub struct BranchRun {
    /// Id of the record kept for recovery; `None` once it was deleted.
    pub operation_id: Option<String>,
    pub result: BranchResult,
}

/// How far the git stages got.
#[derive(Debug, Default)]
struct Progress {
    created: bool,
    committed: bool,
    pushed: bool,
}

enum StageError {
    Git(anyhow::Error),
    Store(CoreError),
}

impl From<CoreError> for StageError {
    fn from(e: CoreError) -> Self {
        Self::Store(e)
    }
}

fn git_step(context: String) -> impl FnOnce(codesplit_git::Error) -> StageError {
    move |e| StageError::Git(anyhow::Error::from(e).context(context))
}

/// The `codesplit recover` hint printed next to a kept record.
#[must_use]
pub fn recovery_hint(operation_id: &str) -> String {
    format!("run `codesplit recover --id {operation_id}` to clean up")
}

/// Service producing owner branches with injected collaborators.
pub struct BranchService<'a, G, R, P, S>
where
    G: GitOps,
    R: OwnerResolver + ?Sized,
    P: PullRequestApi,
    S: OperationStore,
{
    git: &'a G,
    resolver: &'a R,
    prs: Option<&'a P>,
    store: &'a S,
}

impl<'a, G, R, P, S> BranchService<'a, G, R, P, S>
where
    G: GitOps,
    R: OwnerResolver + ?Sized,
    P: PullRequestApi,
    S: OperationStore,
{
    /// Create a new branch service. `prs` may be `None` when no PRs are requested.
    #[must_use]
    pub const fn new(git: &'a G, resolver: &'a R, prs: Option<&'a P>, store: &'a S) -> Self {
        Self {
            git,
            resolver,
            prs,
            store,
        }
    }

    pub(crate) const fn store(&self) -> &'a S {
        self.store
    }

    pub(crate) const fn git(&self) -> &'a G {
        self.git
    }

    pub(crate) const fn resolver(&self) -> &'a R {
        self.resolver
    }

    /// Check the preconditions every branch-producing command shares and
    /// return the branch to come back to.
    pub fn precheck(&self, options: &BranchOptions) -> Result<String> {
        options.validate()?;
        if options.wants_pr() && self.prs.is_none() {
            bail!("creating pull requests needs the GitHub CLI (`gh`)");
        }

        let original = self
            .git
            .current_branch()
            .context("Cannot determine the current branch")?;

        let staged = self.git.staged_files()?;
        if !staged.is_empty() {
            return Err(CoreError::StagedChanges { files: staged }.into());
        }
        Ok(original)
    }

    /// Run a single-owner operation under its own record.
    ///
    /// The record is deleted on success and whenever nothing was touched; a
    /// failed run keeps it for `codesplit recover`.
    pub fn run(&self, request: &BranchRequest<'_>, options: &BranchOptions) -> Result<BranchRun> {
        request.validate()?;
        let original = self.precheck(options)?;
        let record = self
            .store
            .create(OperationKind::SingleBranch, &original, options.snapshot())?;
        let id = record.id;

        let result = match self.execute(&id, &original, request, options) {
            Ok(result) => result,
            Err(e) => {
                if let Err(store_err) = self.store.fail(&id, &format!("{e:#}")) {
                    tracing::warn!(%id, error = %store_err, "could not mark operation failed");
                }
                return Err(e.context(recovery_hint(&id)));
            }
        };

        let operation_id = match &result.outcome {
            BranchOutcome::Succeeded => {
                self.store.complete(&id, true)?;
                None
            }
            BranchOutcome::Skipped | BranchOutcome::Rejected(_) => {
                self.store.delete(&id)?;
                None
            }
            BranchOutcome::Failed(message) => {
                self.store.fail(&id, message)?;
                Some(id)
            }
        };
        Ok(BranchRun {
            operation_id,
            result,
        })
    }

    /// Produce `request`'s branch, recording progress under `operation_id`.
    ///
    /// Per-owner problems come back as a [`BranchResult`] so sibling owners
    /// can still run. State-store failures, and any failure to get back onto
    /// `original`, are errors: nothing else may run from the wrong branch.
    pub fn execute(
        &self,
        operation_id: &str,
        original: &str,
        request: &BranchRequest<'_>,
        options: &BranchOptions,
    ) -> Result<BranchResult> {
        let name = request.branch_name.as_str();
        let owner = request.owner;

        let changed = self
            .git
            .changed_files()
            .context("Failed to list changed files")?;
        let default_owner = options.is_default_owner.then_some(owner);
        let map = OwnershipMap::build(&changed, self.resolver, default_owner);
        let files = map.files_for(owner);
        let mut result = BranchResult::new(request, files, map.files_by_default(owner).to_vec());

        if result.files.is_empty() {
            tracing::debug!(%owner, "no changed files for owner");
            return Ok(result);
        }

        let exists = self.git.branch_exists(name);
        if exists && !options.append {
            result.outcome = BranchOutcome::Rejected(format!(
                "branch '{name}' already exists (use --append to add a commit to it)"
            ));
            return Ok(result);
        }
        if !exists && options.append {
            result.outcome = BranchOutcome::Rejected(format!(
                "branch '{name}' does not exist, nothing to append to"
            ));
            return Ok(result);
        }

        self.store
            .upsert_branch(operation_id, name, &BranchPatch::register(owner, &result.files))?;

        let mut progress = Progress::default();
        let stages =
            self.run_stages(operation_id, request, options, &result.files, exists, &mut progress);
        match stages {
            Ok(()) => {}
            Err(StageError::Store(e)) => {
                let cleanup =
                    self.clean_up(operation_id, name, original, &result.files, &progress, options);
                tracing::debug!(branch = %name, ?cleanup, "rolled back after state store failure");
                return Err(anyhow::Error::from(e)
                    .context(format!("Failed to record progress for '{name}'")));
            }
            Err(StageError::Git(e)) => {
                let message = format!("{e:#}");
                tracing::debug!(branch = %name, error = %message, "branch operation failed");
                let cleanup =
                    self.clean_up(operation_id, name, original, &result.files, &progress, options);
                self.store
                    .upsert_branch(operation_id, name, &BranchPatch::error(message.clone()))?;
                if let Cleanup::CheckoutFailed(e) = &cleanup {
                    bail!(
                        "{message}; could not return to '{original}' afterwards ({e}), \
                         '{name}' is still checked out"
                    );
                }
                result.cleanup = Some(cleanup);
                result.outcome = BranchOutcome::Failed(message);
                return Ok(result);
            }
        }
        result.pushed = progress.pushed;

        self.git
            .checkout(original)
            .with_context(|| format!("Failed to return to '{original}' after updating '{name}'"))?;

        if options.wants_pr() {
            self.store.set_stage(operation_id, Stage::CreatingPr)?;
            match self.open_pr(request, options) {
                Ok(pr) => {
                    self.store
                        .upsert_branch(operation_id, name, &BranchPatch::pr(&pr.url, pr.number))?;
                    result.pr = Some(pr);
                }
                Err(e) => {
                    let message = format!("pull request: {e:#}");
                    self.store
                        .upsert_branch(operation_id, name, &BranchPatch::error(message.clone()))?;
                    result.pr_error = Some(message);
                }
            }
        }

        result.outcome = BranchOutcome::Succeeded;
        Ok(result)
    }

    fn run_stages(
        &self,
        id: &str,
        request: &BranchRequest<'_>,
        options: &BranchOptions,
        files: &[String],
        exists: bool,
        progress: &mut Progress,
    ) -> std::result::Result<(), StageError> {
        let name = request.branch_name.as_str();

        self.store.set_stage(id, Stage::CreatingBranch)?;
        if !exists {
            self.git
                .create_branch(name)
                .map_err(git_step(format!("Failed to create branch '{name}'")))?;
            progress.created = true;
            self.store.upsert_branch(id, name, &BranchPatch::created())?;
        }
        self.git
            .checkout(name)
            .map_err(git_step(format!("Failed to check out '{name}'")))?;

        self.store.set_stage(id, Stage::Committing)?;
        self.git
            .stage_files(files)
            .map_err(git_step(format!("Failed to stage files on '{name}'")))?;
        self.git
            .commit(request.commit_message, options.verify)
            .map_err(git_step(format!("Failed to commit to '{name}'")))?;
        progress.committed = true;
        self.store.upsert_branch(id, name, &BranchPatch::committed())?;

        if options.push {
            self.store.set_stage(id, Stage::Pushing)?;
            let push = PushOptions {
                branch: name,
                remote: &options.remote,
                upstream: options.upstream.as_deref(),
                force: options.force,
                verify: options.verify,
            };
            self.git.push(&push).map_err(git_step(format!(
                "Failed to push '{name}' to '{}'",
                options.remote
            )))?;
            progress.pushed = true;
            self.store.upsert_branch(id, name, &BranchPatch::pushed())?;
        }
        Ok(())
    }

    /// Roll back after a failed stage. Never fails; the returned value says
    /// what was left behind.
    fn clean_up(
        &self,
        id: &str,
        name: &str,
        original: &str,
        files: &[String],
        progress: &Progress,
        options: &BranchOptions,
    ) -> Cleanup {
        if let Err(e) = self.git.checkout(original) {
            tracing::warn!(%original, error = %e, "could not return to original branch");
            return Cleanup::CheckoutFailed(e.to_string());
        }

        if !progress.committed {
            // A failed commit leaves the owner's files staged.
            if let Err(e) = self.git.unstage_files(files) {
                tracing::warn!(error = %e, "could not unstage files");
            }
        }

        if !progress.created {
            return Cleanup::Existing;
        }

        let restored = progress.committed;
        if restored {
            if let Err(e) = self.git.restore_files_from(name, files) {
                tracing::warn!(branch = %name, error = %e, "could not restore files");
                return Cleanup::RestoreFailed(e.to_string());
            }
            // Recovery must not copy the files over again once the user
            // has carried on editing them.
            if let Err(e) = self.store.upsert_branch(id, name, &BranchPatch::restored()) {
                tracing::warn!(branch = %name, error = %e, "could not record restored files");
            }
        }

        if options.keep_branch_on_failure {
            return Cleanup::Kept { restored };
        }
        match self.git.delete_branch(name) {
            Ok(()) => Cleanup::Deleted { restored },
            Err(e) => Cleanup::DeleteFailed(e.to_string()),
        }
    }

    fn open_pr(&self, request: &BranchRequest<'_>, options: &BranchOptions) -> Result<PullRequest> {
        let prs = self.prs.context("GitHub CLI unavailable")?;

        let base = match prs.default_branch() {
            Ok(base) => base,
            Err(e) => {
                tracing::debug!(error = %e, "falling back to local default branch detection");
                self.git
                    .detect_default_branch()
                    .unwrap_or_else(|| "main".to_string())
            }
        };

        let pr = CreatePullRequest {
            title: request.commit_message.to_string(),
            body: options.pr_body.clone().unwrap_or_default(),
            head: request.branch_name.to_string(),
            base,
            draft: options.draft_pr,
        };
        Ok(prs.create_pr(&pr)?)
    }
}
