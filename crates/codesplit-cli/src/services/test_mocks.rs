//! Mock implementations for testing services.
//!
//! These mocks implement the traits from codesplit-git, codesplit-core and
//! codesplit-github so the branch state machine can be exercised without a
//! real repository, state directory or GitHub.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use codesplit_core::{OperationRecord, OperationStore, OwnerResolver, Result as CoreResult, Stage};
use codesplit_git::{GitOps, Oid, PushOptions, Result as GitResult};
use codesplit_github::{CreatePullRequest, PullRequest, PullRequestApi, Result as GhResult};

fn git_failure(command: &str) -> codesplit_git::Error {
    codesplit_git::Error::CommandFailed {
        command: command.to_string(),
        message: "simulated failure".to_string(),
    }
}

/// A commit made through the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    pub branch: String,
    pub message: String,
    pub files: Vec<String>,
    pub verify: bool,
}

/// Mock implementation of `GitOps` for testing.
///
/// Committing moves files out of the changed set; restoring them from a
/// branch puts them back, the way the real working tree behaves once the
/// original branch is checked out again.
pub struct MockGitOps {
    pub current_branch: RefCell<String>,
    pub branches: RefCell<HashSet<String>>,
    pub changed: RefCell<Vec<String>>,
    pub staged: RefCell<Vec<String>>,
    pub commits: RefCell<Vec<MockCommit>>,
    pub pushes: RefCell<Vec<String>>,
    pub restored: RefCell<Vec<(String, Vec<String>)>>,
    pub deleted: RefCell<Vec<String>>,
    pub checkouts: RefCell<Vec<String>>,
    pub push_failures: RefCell<HashSet<String>>,
    pub commit_failures: RefCell<HashSet<String>>,
    pub checkout_failures: RefCell<HashSet<String>>,
    pub restore_fails: RefCell<bool>,
    pub delete_fails: RefCell<bool>,
    pub default_branch: RefCell<Option<String>>,
}

impl Default for MockGitOps {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitOps {
    pub fn new() -> Self {
        let mut branches = HashSet::new();
        branches.insert("main".to_string());
        Self {
            current_branch: RefCell::new("main".to_string()),
            branches: RefCell::new(branches),
            changed: RefCell::new(Vec::new()),
            staged: RefCell::new(Vec::new()),
            commits: RefCell::new(Vec::new()),
            pushes: RefCell::new(Vec::new()),
            restored: RefCell::new(Vec::new()),
            deleted: RefCell::new(Vec::new()),
            checkouts: RefCell::new(Vec::new()),
            push_failures: RefCell::new(HashSet::new()),
            commit_failures: RefCell::new(HashSet::new()),
            checkout_failures: RefCell::new(HashSet::new()),
            restore_fails: RefCell::new(false),
            delete_fails: RefCell::new(false),
            default_branch: RefCell::new(Some("main".to_string())),
        }
    }

    pub fn with_changed(self, files: &[&str]) -> Self {
        *self.changed.borrow_mut() = files.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn with_staged(self, files: &[&str]) -> Self {
        *self.staged.borrow_mut() = files.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn with_branch(self, name: &str) -> Self {
        self.branches.borrow_mut().insert(name.to_string());
        self
    }

    pub fn with_current_branch(self, name: &str) -> Self {
        *self.current_branch.borrow_mut() = name.to_string();
        self.branches.borrow_mut().insert(name.to_string());
        self
    }

    pub fn with_push_failure(self, branch: &str) -> Self {
        self.push_failures.borrow_mut().insert(branch.to_string());
        self
    }

    pub fn with_commit_failure(self, branch: &str) -> Self {
        self.commit_failures.borrow_mut().insert(branch.to_string());
        self
    }

    pub fn with_checkout_failure(self, branch: &str) -> Self {
        self.checkout_failures.borrow_mut().insert(branch.to_string());
        self
    }

    pub fn with_restore_failure(self) -> Self {
        *self.restore_fails.borrow_mut() = true;
        self
    }

    pub fn with_delete_failure(self) -> Self {
        *self.delete_fails.borrow_mut() = true;
        self
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.borrow().contains(name)
    }

    pub fn current(&self) -> String {
        self.current_branch.borrow().clone()
    }

    pub fn commits_on(&self, branch: &str) -> Vec<MockCommit> {
        self.commits
            .borrow()
            .iter()
            .filter(|c| c.branch == branch)
            .cloned()
            .collect()
    }
}

impl GitOps for MockGitOps {
    fn workdir(&self) -> Option<&Path> {
        None
    }

    fn current_branch(&self) -> GitResult<String> {
        Ok(self.current_branch.borrow().clone())
    }

    fn head_detached(&self) -> GitResult<bool> {
        Ok(false)
    }

    fn detect_default_branch(&self) -> Option<String> {
        self.default_branch.borrow().clone()
    }

    fn branch_exists(&self, name: &str) -> bool {
        self.branches.borrow().contains(name)
    }

    fn create_branch(&self, name: &str) -> GitResult<Oid> {
        self.branches.borrow_mut().insert(name.to_string());
        Ok(Oid::zero())
    }

    fn checkout(&self, branch: &str) -> GitResult<()> {
        if self.checkout_failures.borrow().contains(branch) {
            return Err(git_failure("checkout"));
        }
        if !self.branches.borrow().contains(branch) {
            return Err(codesplit_git::Error::BranchNotFound(branch.to_string()));
        }
        self.checkouts.borrow_mut().push(branch.to_string());
        *self.current_branch.borrow_mut() = branch.to_string();
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> GitResult<()> {
        if *self.delete_fails.borrow() {
            return Err(git_failure("branch -D"));
        }
        if !self.branches.borrow_mut().remove(name) {
            return Err(codesplit_git::Error::BranchNotFound(name.to_string()));
        }
        self.deleted.borrow_mut().push(name.to_string());
        Ok(())
    }

    fn list_branches(&self) -> GitResult<Vec<String>> {
        let mut branches: Vec<String> = self.branches.borrow().iter().cloned().collect();
        branches.sort();
        Ok(branches)
    }

    fn changed_files(&self) -> GitResult<Vec<String>> {
        Ok(self.changed.borrow().clone())
    }

    fn staged_files(&self) -> GitResult<Vec<String>> {
        Ok(self.staged.borrow().clone())
    }

    fn stage_files(&self, files: &[String]) -> GitResult<()> {
        self.staged.borrow_mut().extend(files.iter().cloned());
        Ok(())
    }

    fn unstage_files(&self, files: &[String]) -> GitResult<()> {
        self.staged.borrow_mut().retain(|f| !files.contains(f));
        Ok(())
    }

    fn commit(&self, message: &str, verify: bool) -> GitResult<()> {
        let branch = self.current();
        if self.commit_failures.borrow().contains(&branch) {
            return Err(git_failure("commit"));
        }
        let files: Vec<String> = self.staged.borrow_mut().drain(..).collect();
        self.changed.borrow_mut().retain(|f| !files.contains(f));
        self.commits.borrow_mut().push(MockCommit {
            branch,
            message: message.to_string(),
            files,
            verify,
        });
        Ok(())
    }

    fn restore_files_from(&self, branch: &str, files: &[String]) -> GitResult<()> {
        if *self.restore_fails.borrow() {
            return Err(git_failure("checkout --"));
        }
        let mut changed = self.changed.borrow_mut();
        for file in files {
            if !changed.contains(file) {
                changed.push(file.clone());
            }
        }
        changed.sort();
        self.restored
            .borrow_mut()
            .push((branch.to_string(), files.to_vec()));
        Ok(())
    }

    fn push(&self, options: &PushOptions<'_>) -> GitResult<()> {
        if self.push_failures.borrow().contains(options.branch) {
            return Err(codesplit_git::Error::PushFailed(format!(
                "simulated rejection of {}",
                options.branch
            )));
        }
        self.pushes.borrow_mut().push(options.refspec());
        Ok(())
    }
}

/// Mock implementation of `OperationStore` for testing.
pub struct MockOperationStore {
    pub records: RefCell<HashMap<String, OperationRecord>>,
    /// Every stage written, in order.
    pub stages: RefCell<Vec<Stage>>,
    /// Saves left before every further save fails.
    pub saves_before_failure: RefCell<Option<usize>>,
}

impl Default for MockOperationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOperationStore {
    pub fn new() -> Self {
        Self {
            records: RefCell::new(HashMap::new()),
            stages: RefCell::new(Vec::new()),
            saves_before_failure: RefCell::new(None),
        }
    }

    pub fn with_record(self, record: OperationRecord) -> Self {
        self.records
            .borrow_mut()
            .insert(record.id.clone(), record);
        self
    }

    pub fn with_failing_saves_after(self, saves: usize) -> Self {
        *self.saves_before_failure.borrow_mut() = Some(saves);
        self
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn only_record(&self) -> Option<OperationRecord> {
        let records = self.records.borrow();
        if records.len() == 1 {
            records.values().next().cloned()
        } else {
            None
        }
    }
}

impl OperationStore for MockOperationStore {
    fn save(&self, record: &OperationRecord) -> CoreResult<()> {
        if let Some(left) = self.saves_before_failure.borrow_mut().as_mut() {
            if *left == 0 {
                return Err(std::io::Error::other("disk full").into());
            }
            *left -= 1;
        }
        self.stages.borrow_mut().push(record.current_stage);
        self.records
            .borrow_mut()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn load(&self, id: &str) -> CoreResult<Option<OperationRecord>> {
        Ok(self.records.borrow().get(id).cloned())
    }

    fn delete(&self, id: &str) -> CoreResult<()> {
        self.records.borrow_mut().remove(id);
        Ok(())
    }

    fn list(&self) -> CoreResult<Vec<OperationRecord>> {
        let mut records: Vec<OperationRecord> = self.records.borrow().values().cloned().collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}

/// Prefix-based ownership for testing.
#[derive(Default)]
pub struct MockResolver {
    rules: Vec<(String, Vec<String>)>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files under `prefix` are owned by `owners`.
    pub fn with_rule(mut self, prefix: &str, owners: &[&str]) -> Self {
        self.rules.push((
            prefix.to_string(),
            owners.iter().map(|o| (*o).to_string()).collect(),
        ));
        self
    }
}

impl OwnerResolver for MockResolver {
    fn owners_of(&self, path: &str) -> Vec<String> {
        self.rules
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, owners)| owners.clone())
            .unwrap_or_default()
    }
}

/// Mock implementation of `PullRequestApi` for testing.
pub struct MockPullRequestApi {
    pub created: RefCell<Vec<CreatePullRequest>>,
    pub next_number: RefCell<u64>,
    pub fail_heads: RefCell<HashSet<String>>,
    pub default_branch: RefCell<Option<String>>,
}

impl Default for MockPullRequestApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPullRequestApi {
    pub fn new() -> Self {
        Self {
            created: RefCell::new(Vec::new()),
            next_number: RefCell::new(1),
            fail_heads: RefCell::new(HashSet::new()),
            default_branch: RefCell::new(Some("main".to_string())),
        }
    }

    pub fn with_failure_for(self, head: &str) -> Self {
        self.fail_heads.borrow_mut().insert(head.to_string());
        self
    }

    pub fn with_default_branch(self, branch: Option<&str>) -> Self {
        *self.default_branch.borrow_mut() = branch.map(str::to_string);
        self
    }
}

impl PullRequestApi for MockPullRequestApi {
    fn create_pr(&self, pr: &CreatePullRequest) -> GhResult<PullRequest> {
        if self.fail_heads.borrow().contains(&pr.head) {
            return Err(codesplit_github::Error::CommandFailed {
                command: "pr create".to_string(),
                message: "simulated failure".to_string(),
            });
        }
        let number = {
            let mut next = self.next_number.borrow_mut();
            let number = *next;
            *next += 1;
            number
        };
        self.created.borrow_mut().push(pr.clone());
        Ok(PullRequest {
            number,
            url: format!("https://github.com/acme/mono/pull/{number}"),
        })
    }

    fn default_branch(&self) -> GhResult<String> {
        self.default_branch
            .borrow()
            .clone()
            .ok_or_else(|| codesplit_github::Error::UnexpectedOutput("no default branch".into()))
    }
}
