//! Recover service: roll an interrupted or failed operation back.
//!
//! Recovery returns the repository to the record's original branch, removes
//! the branches the operation created (keeping any local-only commits in the
//! working tree first), and finally deletes the record. Files are never
//! copied over uncommitted edits: a branch whose files are modified in the
//! working tree is kept instead.

use anyhow::{Context, Result};
use codesplit_core::{OperationRecord, OperationStore};
use codesplit_git::GitOps;
use serde::Serialize;

/// Which record a `recover` invocation should act on.
#[derive(Debug)]
pub enum Selection {
    Record(Box<OperationRecord>),
    /// Nothing to recover.
    Nothing,
    /// Several candidates and no way to pick one automatically.
    NeedsChoice(Vec<OperationRecord>),
}

/// What a recovery pass did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecoveryReport {
    pub operation_id: String,
    /// The original branch, when it had to be checked out again.
    pub checked_out: Option<String>,
    pub deleted: Vec<String>,
    /// Created branches that were already gone.
    pub already_absent: Vec<String>,
    /// Created branches left in place.
    pub kept: Vec<String>,
    /// Branches whose unpushed files were restored into the working tree.
    pub restored: Vec<String>,
    /// Branches kept because their files have uncommitted changes.
    pub conflicted: Vec<String>,
}

/// Service for recovery with trait-based dependencies.
pub struct RecoverService<'a, G: GitOps, S: OperationStore> {
    git: &'a G,
    store: &'a S,
}

impl<'a, G: GitOps, S: OperationStore> RecoverService<'a, G, S> {
    #[must_use]
    pub const fn new(git: &'a G, store: &'a S) -> Self {
        Self { git, store }
    }

    /// Every record still needing recovery, newest first.
    pub fn incomplete(&self) -> Result<Vec<OperationRecord>> {
        Ok(self.store.list_incomplete()?)
    }

    /// Pick the record to recover.
    ///
    /// An explicit id wins; otherwise a single incomplete record is used, and
    /// with `auto` the newest of several.
    pub fn select(&self, id: Option<&str>, auto: bool) -> Result<Selection> {
        if let Some(id) = id {
            let record = self.store.get(id)?;
            return Ok(Selection::Record(Box::new(record)));
        }

        let mut records = self.incomplete()?;
        match records.len() {
            0 => Ok(Selection::Nothing),
            1 => Ok(Selection::Record(Box::new(records.remove(0)))),
            _ if auto => Ok(Selection::Record(Box::new(records.remove(0)))),
            _ => Ok(Selection::NeedsChoice(records)),
        }
    }

    /// Recover `record`. With `keep_branches`, created branches are left alone.
    pub fn recover(&self, record: &OperationRecord, keep_branches: bool) -> Result<RecoveryReport> {
        let mut report = RecoveryReport {
            operation_id: record.id.clone(),
            ..RecoveryReport::default()
        };
        let original = record.original_branch.as_str();

        let on_original = self
            .git
            .current_branch()
            .is_ok_and(|current| current == original);
        if !on_original {
            self.git.checkout(original).with_context(|| {
                format!(
                    "Could not check out '{original}'. Check it out manually with \
                     `git checkout {original}` and run `codesplit recover --id {}` again",
                    record.id
                )
            })?;
            report.checked_out = Some(original.to_string());
        }

        for branch in record.created_branches() {
            let name = branch.name.as_str();
            if keep_branches {
                report.kept.push(name.to_string());
                continue;
            }
            if !self.git.branch_exists(name) {
                tracing::debug!(branch = %name, "created branch already gone");
                report.already_absent.push(name.to_string());
                continue;
            }

            if branch.needs_restore() {
                let changed = self
                    .git
                    .changed_files()
                    .context("Failed to list changed files")?;
                if branch.files.iter().any(|f| changed.contains(f)) {
                    tracing::warn!(branch = %name, "files modified, keeping branch");
                    report.conflicted.push(name.to_string());
                    continue;
                }
                if let Err(e) = self.git.restore_files_from(name, &branch.files) {
                    tracing::warn!(branch = %name, error = %e, "could not restore, keeping branch");
                    report.kept.push(name.to_string());
                    continue;
                }
                report.restored.push(name.to_string());
            }

            self.git.delete_branch(name).with_context(|| {
                format!(
                    "Failed to delete '{name}'; the operation record was kept, \
                     run `codesplit recover --id {}` again",
                    record.id
                )
            })?;
            report.deleted.push(name.to_string());
        }

        self.store.delete(&record.id)?;
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use codesplit_core::{BranchPatch, OperationKind, OperationOptions, Stage};

    use super::*;
    use crate::services::test_mocks::{MockGitOps, MockOperationStore};

    fn record(original: &str) -> OperationRecord {
        let mut record = OperationRecord::new(
            OperationKind::MultiBranch,
            original,
            OperationOptions {
                push: true,
                ..OperationOptions::default()
            },
        );
        record.current_stage = Stage::Pushing;
        record
    }

    fn with_branch(
        mut record: OperationRecord,
        name: &str,
        patches: &[BranchPatch],
    ) -> OperationRecord {
        record.upsert_branch(name, &BranchPatch::register("@owner", &[format!("{name}.txt")]));
        for patch in patches {
            record.upsert_branch(name, patch);
        }
        record
    }

    #[test]
    fn test_select_nothing() {
        let (git, store) = (MockGitOps::new(), MockOperationStore::new());
        let service = RecoverService::new(&git, &store);
        assert!(matches!(service.select(None, false).unwrap(), Selection::Nothing));
    }

    #[test]
    fn test_select_single_record() {
        let rec = record("main");
        let id = rec.id.clone();
        let git = MockGitOps::new();
        let store = MockOperationStore::new().with_record(rec);
        let service = RecoverService::new(&git, &store);

        match service.select(None, false).unwrap() {
            Selection::Record(r) => assert_eq!(r.id, id),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_select_ignores_complete_records() {
        let mut done = record("main");
        done.current_stage = Stage::Complete;
        let git = MockGitOps::new();
        let store = MockOperationStore::new().with_record(done);
        let service = RecoverService::new(&git, &store);
        assert!(matches!(service.select(None, false).unwrap(), Selection::Nothing));
    }

    #[test]
    fn test_select_several_needs_choice_unless_auto() {
        let mut older = record("main");
        older.timestamp -= Duration::minutes(10);
        let newer = record("main");
        let newer_id = newer.id.clone();
        let git = MockGitOps::new();
        let store = MockOperationStore::new().with_record(older).with_record(newer);
        let service = RecoverService::new(&git, &store);

        match service.select(None, false).unwrap() {
            Selection::NeedsChoice(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0].id, newer_id);
            }
            other => panic!("unexpected: {other:?}"),
        }
        match service.select(None, true).unwrap() {
            Selection::Record(r) => assert_eq!(r.id, newer_id),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_select_explicit_id() {
        let rec = record("main");
        let id = rec.id.clone();
        let git = MockGitOps::new();
        let store = MockOperationStore::new()
            .with_record(rec)
            .with_record(record("main"));
        let service = RecoverService::new(&git, &store);

        assert!(matches!(service.select(Some(&id), false).unwrap(), Selection::Record(_)));
        assert!(service.select(Some("missing"), false).is_err());
    }

    #[test]
    fn test_recover_checks_out_original_and_deletes_created() {
        let rec = with_branch(record("main"), "f/web", &[BranchPatch::created()]);
        let rec = with_branch(rec, "f/api", &[]);
        let id = rec.id.clone();
        let git = MockGitOps::new()
            .with_branch("f/web")
            .with_branch("f/api")
            .with_current_branch("f/web");
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let report = service.recover(&rec, false).unwrap();

        assert_eq!(report.checked_out.as_deref(), Some("main"));
        assert_eq!(report.deleted, vec!["f/web"]);
        assert_eq!(git.current(), "main");
        assert!(!git.has_branch("f/web"));
        // Not created by the operation.
        assert!(git.has_branch("f/api"));
        assert!(store.load(&id).unwrap().is_none());
    }

    #[test]
    fn test_recover_restores_unpushed_commits_before_delete() {
        let rec = with_branch(
            record("main"),
            "f/web",
            &[BranchPatch::created(), BranchPatch::committed()],
        );
        let git = MockGitOps::new().with_branch("f/web");
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let report = service.recover(&rec, false).unwrap();

        assert_eq!(report.restored, vec!["f/web"]);
        assert_eq!(report.deleted, vec!["f/web"]);
        assert_eq!(*git.changed.borrow(), vec!["f/web.txt"]);
        assert!(report.checked_out.is_none());
    }

    #[test]
    fn test_recover_skips_files_rollback_already_restored() {
        let rec = with_branch(
            record("main"),
            "f/web",
            &[
                BranchPatch::created(),
                BranchPatch::committed(),
                BranchPatch::restored(),
            ],
        );
        // The user kept editing the restored file.
        let git = MockGitOps::new()
            .with_branch("f/web")
            .with_changed(&["f/web.txt"]);
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let report = service.recover(&rec, false).unwrap();

        assert!(report.restored.is_empty());
        assert!(report.conflicted.is_empty());
        assert!(git.restored.borrow().is_empty());
        assert_eq!(report.deleted, vec!["f/web"]);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_recover_keeps_branch_when_files_were_edited() {
        let rec = with_branch(
            record("main"),
            "f/web",
            &[BranchPatch::created(), BranchPatch::committed()],
        );
        let git = MockGitOps::new()
            .with_branch("f/web")
            .with_changed(&["f/web.txt"]);
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let report = service.recover(&rec, false).unwrap();

        assert_eq!(report.conflicted, vec!["f/web"]);
        assert!(report.deleted.is_empty());
        assert!(git.restored.borrow().is_empty());
        assert!(git.has_branch("f/web"));
    }

    #[test]
    fn test_recover_does_not_restore_pushed_branches() {
        let rec = with_branch(
            record("main"),
            "f/web",
            &[
                BranchPatch::created(),
                BranchPatch::committed(),
                BranchPatch::pushed(),
            ],
        );
        let git = MockGitOps::new().with_branch("f/web");
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let report = service.recover(&rec, false).unwrap();
        assert!(report.restored.is_empty());
        assert_eq!(report.deleted, vec!["f/web"]);
    }

    #[test]
    fn test_recover_treats_missing_branch_as_recovered() {
        let rec = with_branch(record("main"), "f/web", &[BranchPatch::created()]);
        let git = MockGitOps::new();
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let report = service.recover(&rec, false).unwrap();
        assert_eq!(report.already_absent, vec!["f/web"]);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_recover_keep_branches() {
        let rec = with_branch(record("main"), "f/web", &[BranchPatch::created()]);
        let git = MockGitOps::new().with_branch("f/web");
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let report = service.recover(&rec, true).unwrap();
        assert_eq!(report.kept, vec!["f/web"]);
        assert!(git.has_branch("f/web"));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_recover_keeps_branch_when_restore_fails() {
        let rec = with_branch(
            record("main"),
            "f/web",
            &[BranchPatch::created(), BranchPatch::committed()],
        );
        let git = MockGitOps::new().with_branch("f/web").with_restore_failure();
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let report = service.recover(&rec, false).unwrap();
        assert_eq!(report.kept, vec!["f/web"]);
        assert!(git.has_branch("f/web"));
    }

    #[test]
    fn test_checkout_failure_is_fatal() {
        let rec = with_branch(record("main"), "f/web", &[BranchPatch::created()]);
        let git = MockGitOps::new()
            .with_branch("f/web")
            .with_current_branch("f/web")
            .with_checkout_failure("main");
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        let err = service.recover(&rec, false).unwrap_err();
        assert!(err.to_string().contains("git checkout main"));
        assert!(git.has_branch("f/web"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_delete_failure_keeps_record() {
        let rec = with_branch(record("main"), "f/web", &[BranchPatch::created()]);
        let git = MockGitOps::new().with_branch("f/web").with_delete_failure();
        let store = MockOperationStore::new().with_record(rec.clone());
        let service = RecoverService::new(&git, &store);

        assert!(service.recover(&rec, false).is_err());
        assert_eq!(store.len(), 1);
    }
}
