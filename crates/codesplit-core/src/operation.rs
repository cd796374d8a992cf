//! Durable operation records.
//!
//! One [`OperationRecord`] is written for every branch-producing command. It
//! names the branch to return to and, per owner, how far that owner's branch
//! got, so an interrupted run can be rolled back by `codesplit recover`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which command produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    /// `codesplit branch`.
    SingleBranch,
    /// `codesplit multi-branch`.
    MultiBranch,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SingleBranch => "single-branch",
            Self::MultiBranch => "multi-branch",
        })
    }
}

/// Progress of an operation.
///
/// Stages advance in declaration order; `Failed` can be entered from any of
/// them. In multi-branch runs the stage tracks the owner currently being
/// processed and starts over at `CreatingBranch` for each owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Initializing,
    CreatingBranch,
    Committing,
    Pushing,
    CreatingPr,
    Complete,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initializing => "initializing",
            Self::CreatingBranch => "creating-branch",
            Self::Committing => "committing",
            Self::Pushing => "pushing",
            Self::CreatingPr => "creating-pr",
            Self::Complete => "complete",
            Self::Failed => "failed",
        })
    }
}

/// Snapshot of the flags an operation was started with.
///
/// Kept for diagnostics; recovery does not read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)] // CLI flags map directly to fields
pub struct OperationOptions {
    pub verify: bool,
    pub push: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
    pub force: bool,
    pub keep_branch_on_failure: bool,
    pub append: bool,
    pub pr: bool,
    pub draft_pr: bool,
}

/// Progress of one owner's branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Full branch name.
    pub name: String,
    /// Owner this branch serves.
    pub owner: String,
    /// Files committed (or about to be committed) on the branch.
    pub files: Vec<String>,
    /// The branch was created by this operation (not appended to).
    pub created: bool,
    pub committed: bool,
    pub pushed: bool,
    /// Rollback already copied the branch's files back into the working tree.
    #[serde(default)]
    pub restored: bool,
    pub pr_created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<u64>,
    /// Last failure for this branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BranchRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: String::new(),
            files: Vec::new(),
            created: false,
            committed: false,
            pushed: false,
            restored: false,
            pr_created: false,
            pr_url: None,
            pr_number: None,
            error: None,
        }
    }

    /// Whether recovery still has to copy this branch's files back: it holds
    /// a local-only commit that rollback has not restored yet.
    #[must_use]
    pub const fn needs_restore(&self) -> bool {
        self.committed && !self.pushed && !self.restored
    }

    /// Whether this branch reached its goal for an operation that
    /// did (`push == true`) or did not request a push.
    #[must_use]
    pub const fn reached_goal(&self, push: bool) -> bool {
        if push { self.pushed } else { self.committed }
    }
}

/// Fields to merge into a [`BranchRecord`].
///
/// Flags are one-way: a `true` here sets the flag, a `false` leaves it as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct BranchPatch {
    pub owner: Option<String>,
    pub files: Option<Vec<String>>,
    pub created: bool,
    pub committed: bool,
    pub pushed: bool,
    pub restored: bool,
    pub pr_created: bool,
    pub pr_url: Option<String>,
    pub pr_number: Option<u64>,
    pub error: Option<String>,
}

impl BranchPatch {
    /// Patch that registers a branch for `owner` with its file set.
    #[must_use]
    pub fn register(owner: &str, files: &[String]) -> Self {
        Self {
            owner: Some(owner.to_string()),
            files: Some(files.to_vec()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn created() -> Self {
        Self {
            created: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn committed() -> Self {
        Self {
            committed: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn pushed() -> Self {
        Self {
            pushed: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn restored() -> Self {
        Self {
            restored: true,
            ..Self::default()
        }
    }

    /// Patch recording a created pull request.
    #[must_use]
    pub fn pr(url: &str, number: u64) -> Self {
        Self {
            pr_created: true,
            pr_url: Some(url.to_string()),
            pr_number: Some(number),
            ..Self::default()
        }
    }

    /// Patch recording a failure message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Merge this patch into `record`.
    pub fn apply(&self, record: &mut BranchRecord) {
        if let Some(owner) = &self.owner {
            if record.owner.is_empty() {
                record.owner.clone_from(owner);
            }
        }
        // The file set is fixed when the branch is registered.
        if let Some(files) = &self.files {
            if record.files.is_empty() {
                record.files.clone_from(files);
            }
        }
        record.created |= self.created;
        record.committed |= self.committed;
        record.pushed |= self.pushed;
        record.restored |= self.restored;
        record.pr_created |= self.pr_created;
        if self.pr_url.is_some() {
            record.pr_url.clone_from(&self.pr_url);
        }
        if self.pr_number.is_some() {
            record.pr_number = self.pr_number;
        }
        if self.error.is_some() {
            record.error.clone_from(&self.error);
        }
    }
}

/// A top-level branch-producing invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: OperationKind,
    /// Branch checked out when the operation started; the recovery target.
    pub original_branch: String,
    pub current_stage: Stage,
    pub options: OperationOptions,
    /// Per-owner branches in the order they were first touched.
    #[serde(default)]
    pub branches: Vec<BranchRecord>,
    /// Failure not tied to a specific branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Name of the branch record most recently written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_touched: Option<String>,
}

impl OperationRecord {
    /// A fresh `initializing` record with a new id.
    #[must_use]
    pub fn new(kind: OperationKind, original_branch: &str, options: OperationOptions) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            original_branch: original_branch.to_string(),
            current_stage: Stage::Initializing,
            options,
            branches: Vec::new(),
            error: None,
            last_touched: None,
        }
    }

    /// Look up a branch record by branch name.
    #[must_use]
    pub fn branch(&self, name: &str) -> Option<&BranchRecord> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Insert or merge a branch record, matched by branch name.
    pub fn upsert_branch(&mut self, name: &str, patch: &BranchPatch) {
        let index = match self.branches.iter().position(|b| b.name == name) {
            Some(index) => index,
            None => {
                self.branches.push(BranchRecord::new(name));
                self.branches.len() - 1
            }
        };
        patch.apply(&mut self.branches[index]);
        self.last_touched = Some(name.to_string());
    }

    /// Mark the record failed.
    ///
    /// The message is kept at the operation level and attached to the most
    /// recently touched branch when that branch has no error of its own.
    pub fn mark_failed(&mut self, message: &str) {
        self.current_stage = Stage::Failed;
        self.error = Some(message.to_string());

        let last = self.last_touched.clone();
        if let Some(branch) = last
            .and_then(|name| self.branches.iter_mut().find(|b| b.name == name))
        {
            if branch.error.is_none() {
                branch.error = Some(message.to_string());
            }
        }
    }

    /// Whether the record still needs recovery.
    #[must_use]
    pub fn is_incomplete(&self) -> bool {
        self.current_stage != Stage::Complete
    }

    /// Every branch without an error reached its goal.
    #[must_use]
    pub fn completion_holds(&self) -> bool {
        self.branches
            .iter()
            .filter(|b| b.error.is_none())
            .all(|b| b.reached_goal(self.options.push))
    }

    /// Branches this operation created.
    pub fn created_branches(&self) -> impl Iterator<Item = &BranchRecord> {
        self.branches.iter().filter(|b| b.created)
    }
}
