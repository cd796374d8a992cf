//! Repository wrapper providing high-level git operations.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use git2::{BranchType, Oid, Status, StatusOptions};
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::GitOps;

/// Working-tree status bits that count as a pending change.
const WORKTREE_CHANGES: Status = Status::WT_NEW
    .union(Status::WT_MODIFIED)
    .union(Status::WT_DELETED)
    .union(Status::WT_RENAMED)
    .union(Status::WT_TYPECHANGE);

/// Index status bits that count as a staged change.
const INDEX_CHANGES: Status = Status::INDEX_NEW
    .union(Status::INDEX_MODIFIED)
    .union(Status::INDEX_DELETED)
    .union(Status::INDEX_RENAMED)
    .union(Status::INDEX_TYPECHANGE);

/// Parameters for [`Repository::push`].
#[derive(Debug, Clone, Copy)]
pub struct PushOptions<'a> {
    /// Local branch to push.
    pub branch: &'a str,
    /// Remote name.
    pub remote: &'a str,
    /// Remote branch name, when it differs from the local one.
    pub upstream: Option<&'a str>,
    /// Force the push.
    pub force: bool,
    /// Run the pre-push hook.
    pub verify: bool,
}

impl PushOptions<'_> {
    /// The refspec handed to `git push`.
    #[must_use]
    pub fn refspec(&self) -> String {
        match self.upstream {
            Some(upstream) => format!("{}:{upstream}", self.branch),
            None => self.branch.to_string(),
        }
    }
}

/// High-level wrapper around a git repository.
pub struct Repository {
    inner: git2::Repository,
}

impl Repository {
    /// Open a repository at the given path.
    ///
    /// # Errors
    /// Returns error if no repository found at path or any parent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let inner = git2::Repository::discover(path).map_err(|_| Error::NotARepository)?;
        Ok(Self { inner })
    }

    /// Open the repository containing the current directory.
    ///
    /// # Errors
    /// Returns error if not inside a git repository.
    pub fn open_current() -> Result<Self> {
        Self::open(".")
    }

    /// Get the path to the repository root (workdir).
    #[must_use]
    pub fn workdir(&self) -> Option<&Path> {
        self.inner.workdir()
    }

    /// Get the path to the .git directory.
    #[must_use]
    pub fn git_dir(&self) -> &Path {
        self.inner.path()
    }

    // === Branch operations ===

    /// Get the name of the current branch.
    ///
    /// # Errors
    /// Returns error if HEAD is detached.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead);
        }

        head.shorthand()
            .map(String::from)
            .ok_or(Error::DetachedHead)
    }

    /// Check if HEAD is detached.
    ///
    /// # Errors
    /// Returns error if HEAD cannot be read.
    pub fn head_detached(&self) -> Result<bool> {
        Ok(self.inner.head_detached()?)
    }

    /// Check if a local branch exists.
    #[must_use]
    pub fn branch_exists(&self, name: &str) -> bool {
        self.inner.find_branch(name, BranchType::Local).is_ok()
    }

    /// Create a new branch at the current HEAD.
    ///
    /// # Errors
    /// Returns error if branch creation fails.
    pub fn create_branch(&self, name: &str) -> Result<Oid> {
        let head_commit = self.inner.head()?.peel_to_commit()?;
        let branch = self.inner.branch(name, &head_commit, false)?;
        debug!(branch = name, "created branch");

        branch
            .get()
            .target()
            .ok_or_else(|| Error::BranchNotFound(name.into()))
    }

    /// Checkout a branch with `git checkout`, keeping local modifications.
    ///
    /// # Errors
    /// Returns error if the branch is missing or git refuses the switch.
    pub fn checkout(&self, branch_name: &str) -> Result<()> {
        if !self.branch_exists(branch_name) {
            return Err(Error::BranchNotFound(branch_name.into()));
        }
        self.run_git(&["checkout", "--quiet", branch_name])?;
        Ok(())
    }

    /// Delete a local branch.
    ///
    /// # Errors
    /// Returns error if the branch is missing or is checked out.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        let mut branch = self
            .inner
            .find_branch(name, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(name.into()))?;
        branch.delete()?;
        debug!(branch = name, "deleted branch");
        Ok(())
    }

    /// List all local branches.
    ///
    /// # Errors
    /// Returns error if branch listing fails.
    pub fn list_branches(&self) -> Result<Vec<String>> {
        let branches = self.inner.branches(Some(BranchType::Local))?;

        let names: Vec<String> = branches
            .filter_map(std::result::Result::ok)
            .filter_map(|(b, _)| b.name().ok().flatten().map(String::from))
            .collect();

        Ok(names)
    }

    /// Detect the repository's default branch.
    ///
    /// Prefers the target of `refs/remotes/origin/HEAD`, then a local `main`,
    /// then a local `master`.
    #[must_use]
    pub fn detect_default_branch(&self) -> Option<String> {
        if let Ok(reference) = self.inner.find_reference("refs/remotes/origin/HEAD") {
            if let Some(target) = reference.symbolic_target() {
                if let Some(name) = target.strip_prefix("refs/remotes/origin/") {
                    return Some(name.to_string());
                }
            }
        }

        ["main", "master"]
            .into_iter()
            .find(|name| self.branch_exists(name))
            .map(String::from)
    }

    // === Working tree ===

    /// Paths with unstaged working-tree changes (untracked files included).
    ///
    /// # Errors
    /// Returns error if the status query fails.
    pub fn changed_files(&self) -> Result<Vec<String>> {
        self.paths_with_status(WORKTREE_CHANGES)
    }

    /// Paths with staged changes.
    ///
    /// # Errors
    /// Returns error if the status query fails.
    pub fn staged_files(&self) -> Result<Vec<String>> {
        self.paths_with_status(INDEX_CHANGES)
    }

    fn paths_with_status(&self, mask: Status) -> Result<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.inner.statuses(Some(&mut opts))?;
        let mut paths: Vec<String> = statuses
            .iter()
            .filter(|entry| entry.status().intersects(mask))
            .filter_map(|entry| entry.path().map(String::from))
            .collect();

        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Stage exactly the given paths.
    ///
    /// # Errors
    /// Returns error if `git add` fails.
    pub fn stage_files(&self, files: &[String]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "--all", "--"];
        args.extend(files.iter().map(String::as_str));
        self.run_git(&args)?;
        Ok(())
    }

    /// Reset the given paths in the index to HEAD, keeping working-tree content.
    ///
    /// # Errors
    /// Returns error if `git reset` fails.
    pub fn unstage_files(&self, files: &[String]) -> Result<()> {
        if files.is_empty() {
            return Ok(());
        }
        let mut args = vec!["reset", "--quiet", "--"];
        args.extend(files.iter().map(String::as_str));
        self.run_git(&args)?;
        Ok(())
    }

    /// Commit the index with `git commit`, optionally skipping hooks.
    ///
    /// # Errors
    /// Returns error if a hook rejects the commit or there is nothing to commit.
    pub fn commit(&self, message: &str, verify: bool) -> Result<()> {
        let mut args = vec!["commit", "--quiet", "-m", message];
        if !verify {
            args.push("--no-verify");
        }
        self.run_git(&args)?;
        Ok(())
    }

    /// Restore `files` from `branch` into the working tree, unstaged.
    ///
    /// Paths that exist in the branch tree are checked out and then reset in
    /// the index. Paths missing from the branch tree were deleted there, so the
    /// working-tree copy is removed to reproduce the deletion.
    ///
    /// # Errors
    /// Returns error if the branch is missing or a git step fails.
    pub fn restore_files_from(&self, branch: &str, files: &[String]) -> Result<()> {
        let tree = self
            .inner
            .find_branch(branch, BranchType::Local)
            .map_err(|_| Error::BranchNotFound(branch.into()))?
            .get()
            .peel_to_tree()?;

        let (present, absent): (Vec<&String>, Vec<&String>) = files
            .iter()
            .partition(|file| tree.get_path(Path::new(file.as_str())).is_ok());

        if !present.is_empty() {
            let paths: Vec<&str> = present.iter().map(|f| f.as_str()).collect();

            let mut checkout = vec!["checkout", branch, "--"];
            checkout.extend(&paths);
            self.run_git(&checkout)?;

            let mut reset = vec!["reset", "--quiet", "--"];
            reset.extend(&paths);
            self.run_git(&reset)?;
        }

        let workdir = self.workdir().ok_or(Error::NotARepository)?;
        for file in absent {
            let path = workdir.join(file);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }

        debug!(branch, files = files.len(), "restored files from branch");
        Ok(())
    }

    // === Remote operations ===

    /// Push a branch with live output.
    ///
    /// # Errors
    /// Returns `PushFailed` if git exits unsuccessfully.
    pub fn push(&self, options: &PushOptions<'_>) -> Result<()> {
        let refspec = options.refspec();
        let mut args = vec!["push", "--set-upstream"];
        if options.force {
            args.push("--force");
        }
        if !options.verify {
            args.push("--no-verify");
        }
        args.push(options.remote);
        args.push(&refspec);

        let command_line = format!("git {}", args.join(" "));
        debug!(command = %command_line, "running");

        let status = self
            .git_command()?
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| Error::Spawn {
                command: command_line.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::PushFailed(format!(
                "{command_line} exited with {status}"
            )))
        }
    }

    // === Subprocess helpers ===

    fn git_command(&self) -> Result<Command> {
        let workdir = self.workdir().ok_or(Error::NotARepository)?;
        let mut cmd = Command::new("git");
        cmd.current_dir(workdir);
        Ok(cmd)
    }

    /// Run git with captured output, returning trimmed stdout.
    fn run_git(&self, args: &[&str]) -> Result<String> {
        let command_line = format!("git {}", args.join(" "));
        debug!(command = %command_line, "running");

        let output = self
            .git_command()?
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::Spawn {
                command: command_line.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };
        Err(Error::CommandFailed {
            command: command_line,
            message,
        })
    }

    // === Low-level access ===

    /// Get a reference to the underlying git2 repository.
    ///
    /// Use sparingly - prefer high-level methods.
    #[must_use]
    pub const fn inner(&self) -> &git2::Repository {
        &self.inner
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.git_dir())
            .finish()
    }
}

impl GitOps for Repository {
    fn workdir(&self) -> Option<&Path> {
        Self::workdir(self)
    }

    fn current_branch(&self) -> Result<String> {
        Self::current_branch(self)
    }

    fn head_detached(&self) -> Result<bool> {
        Self::head_detached(self)
    }

    fn detect_default_branch(&self) -> Option<String> {
        Self::detect_default_branch(self)
    }

    fn branch_exists(&self, name: &str) -> bool {
        Self::branch_exists(self, name)
    }

    fn create_branch(&self, name: &str) -> Result<Oid> {
        Self::create_branch(self, name)
    }

    fn checkout(&self, branch: &str) -> Result<()> {
        Self::checkout(self, branch)
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        Self::delete_branch(self, name)
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        Self::list_branches(self)
    }

    fn changed_files(&self) -> Result<Vec<String>> {
        Self::changed_files(self)
    }

    fn staged_files(&self) -> Result<Vec<String>> {
        Self::staged_files(self)
    }

    fn stage_files(&self, files: &[String]) -> Result<()> {
        Self::stage_files(self, files)
    }

    fn unstage_files(&self, files: &[String]) -> Result<()> {
        Self::unstage_files(self, files)
    }

    fn commit(&self, message: &str, verify: bool) -> Result<()> {
        Self::commit(self, message, verify)
    }

    fn restore_files_from(&self, branch: &str, files: &[String]) -> Result<()> {
        Self::restore_files_from(self, branch, files)
    }

    fn push(&self, options: &PushOptions<'_>) -> Result<()> {
        Self::push(self, options)
    }
}
