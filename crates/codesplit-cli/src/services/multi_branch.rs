//! Multi-branch service: one branch per CODEOWNERS owner of the change-set.
//!
//! Owners are processed strictly one after another under a single operation
//! record. An owner's failure is contained in its [`BranchResult`]; only an
//! error escaping the loop (a state store failure, or being unable to return
//! to the original branch) aborts the run and leaves the record `failed`.
//!
//! A file with several owners is committed to the first of them only.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, bail};
use codesplit_core::{
    BranchName, Error as CoreError, OperationKind, OperationStore, OwnerFilter, OwnerResolver,
    OwnershipMap, owner_branch_name, owner_commit_message,
};
use codesplit_git::GitOps;
use codesplit_github::PullRequestApi;

use super::branch::{BranchOptions, BranchRequest, BranchResult, BranchService, recovery_hint};

/// Inputs of a multi-branch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiBranchRequest<'a> {
    /// Branch prefix; each owner gets `{base_branch}/{owner}`.
    pub base_branch: &'a str,
    /// Commit message prefix; each owner gets `{base_message} - {owner}`.
    pub base_message: &'a str,
    pub default_owner: Option<&'a str>,
    /// Comma-separated owner patterns to keep.
    pub include: Option<&'a str>,
    /// Comma-separated owner patterns to drop.
    pub ignore: Option<&'a str>,
}

/// Summary of a completed multi-branch run.
#[derive(Debug, Clone)]
pub struct MultiBranchReport {
    pub operation_id: String,
    pub original_branch: String,
    /// One result per processed owner, in processing order.
    pub results: Vec<BranchResult>,
    /// Changed files no CODEOWNERS rule owns.
    pub unowned: Vec<String>,
    pub default_owner: Option<String>,
    pub pr_requested: bool,
}

impl MultiBranchReport {
    /// Owners whose branch was produced, or who had nothing to commit.
    pub fn succeeded(&self) -> impl Iterator<Item = &BranchResult> {
        self.results.iter().filter(|r| r.succeeded() || r.skipped())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BranchResult> {
        self.results
            .iter()
            .filter(|r| !r.succeeded() && !r.skipped())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &BranchResult> {
        self.results.iter().filter(|r| r.skipped())
    }

    /// Number of pull requests opened.
    #[must_use]
    pub fn prs_created(&self) -> usize {
        self.results.iter().filter(|r| r.pr.is_some()).count()
    }

    /// Number of pushed branches whose pull request could not be opened.
    #[must_use]
    pub fn prs_failed(&self) -> usize {
        self.results.iter().filter(|r| r.pr_error.is_some()).count()
    }
}

/// How a multi-branch run ended without error.
#[derive(Debug, Clone)]
pub enum MultiBranchOutcome {
    /// No owner was left to process; nothing was touched.
    NoOwners {
        /// Changed files without a CODEOWNERS owner.
        unowned: Vec<String>,
        /// Owners removed by `--include` / `--ignore`.
        filtered_out: usize,
    },
    Completed(MultiBranchReport),
}

enum Plan {
    Nothing {
        unowned: Vec<String>,
        filtered_out: usize,
    },
    Owners {
        branches: Vec<PlannedBranch>,
        unowned: Vec<String>,
    },
}

struct PlannedBranch {
    owner: String,
    name: BranchName,
    /// The owner's changed files when the run started.
    files: Vec<String>,
}

/// Service fanning a change-set out into owner branches.
pub struct MultiBranchService<'a, G, R, P, S>
where
    G: GitOps,
    R: OwnerResolver + ?Sized,
    P: PullRequestApi,
    S: OperationStore,
{
    branch: BranchService<'a, G, R, P, S>,
}

impl<'a, G, R, P, S> MultiBranchService<'a, G, R, P, S>
where
    G: GitOps,
    R: OwnerResolver + ?Sized,
    P: PullRequestApi,
    S: OperationStore,
{
    #[must_use]
    pub const fn new(git: &'a G, resolver: &'a R, prs: Option<&'a P>, store: &'a S) -> Self {
        Self {
            branch: BranchService::new(git, resolver, prs, store),
        }
    }

    /// Run the whole multi-branch operation.
    pub fn run(
        &self,
        request: &MultiBranchRequest<'_>,
        options: &BranchOptions,
    ) -> Result<MultiBranchOutcome> {
        if request.base_branch.trim().is_empty() {
            bail!(CoreError::InvalidOptions("a base branch name is required".into()));
        }
        if request.base_message.trim().is_empty() {
            bail!(CoreError::InvalidOptions("a base commit message is required".into()));
        }
        let filter = OwnerFilter::from_args(request.include, request.ignore)?;
        let original = self.branch.precheck(options)?;

        let store = self.branch.store();
        let record = store.create(OperationKind::MultiBranch, &original, options.snapshot())?;
        let id = record.id;

        // Nothing has been mutated until the loop starts, so planning
        // problems discard the record.
        let plan = match self.plan(request, &filter) {
            Ok(plan) => plan,
            Err(e) => {
                self.discard(&id);
                return Err(e);
            }
        };
        let (branches, unowned) = match plan {
            Plan::Nothing {
                unowned,
                filtered_out,
            } => {
                self.discard(&id);
                return Ok(MultiBranchOutcome::NoOwners {
                    unowned,
                    filtered_out,
                });
            }
            Plan::Owners { branches, unowned } => (branches, unowned),
        };

        tracing::debug!(%id, owners = branches.len(), "processing owners");
        let mut results = Vec::with_capacity(branches.len());
        let mut committed_to: BTreeMap<String, String> = BTreeMap::new();
        for PlannedBranch {
            owner,
            name: branch_name,
            files,
        } in &branches
        {
            let message = owner_commit_message(request.base_message, owner);
            let owner_options = BranchOptions {
                is_default_owner: request.default_owner == Some(owner.as_str()),
                ..options.clone()
            };
            let branch_request = BranchRequest {
                owner,
                branch_name,
                commit_message: &message,
            };

            match self
                .branch
                .execute(&id, &original, &branch_request, &owner_options)
            {
                Ok(mut result) => {
                    if result.succeeded() {
                        for file in &result.files {
                            committed_to.insert(file.clone(), result.branch_name.clone());
                        }
                    } else if result.skipped() {
                        let claimed: BTreeSet<&String> =
                            files.iter().filter_map(|f| committed_to.get(f)).collect();
                        result.claimed_by = claimed.into_iter().cloned().collect();
                    }
                    results.push(result);
                }
                Err(e) => {
                    if let Err(store_err) = store.fail(&id, &format!("{e:#}")) {
                        tracing::warn!(%id, error = %store_err, "could not mark operation failed");
                    }
                    return Err(e.context(format!(
                        "multi-branch operation {id} aborted; {}",
                        recovery_hint(&id)
                    )));
                }
            }
        }

        store.complete(&id, true)?;
        Ok(MultiBranchOutcome::Completed(MultiBranchReport {
            operation_id: id,
            original_branch: original,
            results,
            unowned,
            default_owner: request.default_owner.map(str::to_string),
            pr_requested: options.wants_pr(),
        }))
    }

    fn plan(&self, request: &MultiBranchRequest<'_>, filter: &OwnerFilter) -> Result<Plan> {
        let changed = self.branch.git().changed_files()?;
        if changed.is_empty() {
            bail!("no changed files to split");
        }

        let map = OwnershipMap::build(&changed, self.branch.resolver(), request.default_owner);
        let owners = filter.apply(map.owners());
        let unowned = map.unowned().to_vec();
        if owners.is_empty() {
            return Ok(Plan::Nothing {
                unowned,
                filtered_out: map.owners().len(),
            });
        }

        let mut branches = Vec::with_capacity(owners.len());
        let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for owner in owners {
            let name = owner_branch_name(request.base_branch, &owner)?;
            by_name
                .entry(name.to_string())
                .or_default()
                .push(owner.clone());
            let files = map.files_for(&owner);
            branches.push(PlannedBranch { owner, name, files });
        }
        if let Some((branch, owners)) = by_name.into_iter().find(|(_, owners)| owners.len() > 1) {
            return Err(CoreError::BranchNameCollision { branch, owners }.into());
        }

        Ok(Plan::Owners { branches, unowned })
    }

    fn discard(&self, id: &str) {
        if let Err(e) = self.branch.store().delete(id) {
            tracing::warn!(%id, error = %e, "could not discard operation record");
        }
    }
}
