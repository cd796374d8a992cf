//! Trait abstractions for operation storage and ownership lookup.
//!
//! `OperationStore` keeps the durable progress log that recovery depends on;
//! `OwnerResolver` is the CODEOWNERS lookup. Both are injected into the
//! services so they can be swapped for in-memory versions in tests.

use crate::Result;
use crate::error::Error;
use crate::operation::{BranchPatch, OperationKind, OperationOptions, OperationRecord, Stage};

/// Durable storage for [`OperationRecord`]s of one working directory.
///
/// Implementors provide four primitives. Every mutating operation the
/// services use is built on top of them as a load, modify, save cycle, so a
/// crash right after any provided method returns never loses that change.
#[allow(clippy::missing_errors_doc)]
pub trait OperationStore {
    /// Persist `record`, replacing any previous version.
    ///
    /// Must not return until the record is flushed to durable storage.
    fn save(&self, record: &OperationRecord) -> Result<()>;

    /// Load a record by id. `Ok(None)` when no such record exists.
    fn load(&self, id: &str) -> Result<Option<OperationRecord>>;

    /// Remove a record. Removing a missing record is not an error.
    fn delete(&self, id: &str) -> Result<()>;

    /// All records for this working directory, newest first.
    fn list(&self) -> Result<Vec<OperationRecord>>;

    /// Allocate and persist a new `initializing` record.
    fn create(
        &self,
        kind: OperationKind,
        original_branch: &str,
        options: OperationOptions,
    ) -> Result<OperationRecord> {
        let record = OperationRecord::new(kind, original_branch, options);
        self.save(&record)?;
        tracing::debug!(id = %record.id, %kind, "created operation record");
        Ok(record)
    }

    /// Load a record, failing with [`Error::OperationNotFound`] if it is gone.
    fn get(&self, id: &str) -> Result<OperationRecord> {
        self.load(id)?
            .ok_or_else(|| Error::OperationNotFound(id.to_string()))
    }

    /// Apply `f` to the stored record and persist the result.
    fn update(&self, id: &str, f: &mut dyn FnMut(&mut OperationRecord)) -> Result<OperationRecord> {
        let mut record = self.get(id)?;
        f(&mut record);
        self.save(&record)?;
        Ok(record)
    }

    /// Advance the record to `stage`.
    fn set_stage(&self, id: &str, stage: Stage) -> Result<()> {
        tracing::debug!(%id, %stage, "stage transition");
        self.update(id, &mut |record| record.current_stage = stage)?;
        Ok(())
    }

    /// Insert the branch record `name` or merge `patch` into it.
    fn upsert_branch(&self, id: &str, name: &str, patch: &BranchPatch) -> Result<()> {
        self.update(id, &mut |record| record.upsert_branch(name, patch))?;
        Ok(())
    }

    /// Mark the record complete and, when `delete_on_success`, remove it.
    fn complete(&self, id: &str, delete_on_success: bool) -> Result<()> {
        let record = self.update(id, &mut |record| record.current_stage = Stage::Complete)?;
        if !record.completion_holds() {
            tracing::warn!(%id, "operation completed with branches short of their goal");
        }
        if delete_on_success {
            self.delete(id)?;
        }
        Ok(())
    }

    /// Mark the record failed with `message`.
    fn fail(&self, id: &str, message: &str) -> Result<()> {
        self.update(id, &mut |record| record.mark_failed(message))?;
        Ok(())
    }

    /// Records that still need recovery, newest first.
    fn list_incomplete(&self) -> Result<Vec<OperationRecord>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(OperationRecord::is_incomplete)
            .collect())
    }
}

/// Maps a repository path to the owners responsible for it.
pub trait OwnerResolver {
    /// Owners of `path` in rule order. Empty when no rule matches.
    fn owners_of(&self, path: &str) -> Vec<String>;
}
