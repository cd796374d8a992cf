//! File-backed operation store.
//!
//! Layout: `<root>/<repo-key>/<operation-id>.json`. The repo key is a short
//! SHA-256 of the canonical working directory so records of different
//! checkouts never mix.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::operation::OperationRecord;
use crate::traits::OperationStore;

/// Environment variable overriding the state root.
pub const STATE_DIR_ENV: &str = "CODESPLIT_STATE_DIR";

/// Operation records for one working directory, stored as JSON files.
#[derive(Debug, Clone)]
pub struct FileOperationStore {
    dir: PathBuf,
}

impl FileOperationStore {
    const EXTENSION: &'static str = "json";

    /// Store for `workdir`, rooted according to the environment and `config`.
    ///
    /// # Errors
    /// Returns [`Error::NoStateDir`] if no root can be determined.
    pub fn for_workdir(workdir: &Path, config: &Config) -> Result<Self> {
        let root = resolve_root(std::env::var_os(STATE_DIR_ENV), config)?;
        Ok(Self::at(&root, workdir))
    }

    /// Store for `workdir` under an explicit root.
    #[must_use]
    pub fn at(root: &Path, workdir: &Path) -> Self {
        Self {
            dir: root.join(repo_key(workdir)),
        }
    }

    /// Directory holding this working directory's records.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &str) -> Option<PathBuf> {
        is_valid_id(id).then(|| self.dir.join(format!("{id}.{}", Self::EXTENSION)))
    }

    fn read_record(path: &Path) -> Result<OperationRecord> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::StateParseError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

impl OperationStore for FileOperationStore {
    fn save(&self, record: &OperationRecord) -> Result<()> {
        let path = self
            .record_path(&record.id)
            .ok_or_else(|| Error::OperationNotFound(record.id.clone()))?;
        fs::create_dir_all(&self.dir)?;

        let content = serde_json::to_string_pretty(record)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        tracing::debug!(
            id = %record.id,
            stage = %record.current_stage,
            branches = record.branches.len(),
            "saved operation record"
        );
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<OperationRecord>> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let Some(path) = self.record_path(id) else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(%id, "deleted operation record");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<OperationRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(Self::EXTENSION) {
                continue;
            }
            match Self::read_record(&path) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping record");
                }
            }
        }

        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }
}

/// Pick the state root: env override, then config, then `~/.codesplit/operations`.
///
/// # Errors
/// Returns [`Error::NoStateDir`] when none is available.
pub fn resolve_root(env_override: Option<OsString>, config: &Config) -> Result<PathBuf> {
    if let Some(dir) = env_override.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = &config.general.state_dir {
        return Ok(dir.clone());
    }
    dirs::home_dir()
        .map(|home| home.join(".codesplit").join("operations"))
        .ok_or(Error::NoStateDir)
}

/// First 16 hex chars of the SHA-256 of the canonical `workdir`.
#[must_use]
pub fn repo_key(workdir: &Path) -> String {
    let canonical = workdir
        .canonicalize()
        .unwrap_or_else(|_| workdir.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    hex::encode(digest)[..16].to_string()
}

fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
