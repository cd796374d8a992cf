//! Configuration loaded from `.codesplit.toml` at the repository root.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// codesplit configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Defaults for branch-producing commands.
    #[serde(default)]
    pub branch: BranchConfig,

    /// Pull request settings.
    #[serde(default)]
    pub pr: PrConfig,
}

impl Config {
    /// File name looked up in the repository root.
    pub const FILE_NAME: &'static str = ".codesplit.toml";

    /// Load config from a TOML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `.codesplit.toml` from a repository working directory.
    ///
    /// # Errors
    /// Returns error if the file exists but can't be parsed.
    pub fn load_for_workdir(workdir: &Path) -> Result<Self> {
        Self::load(workdir.join(Self::FILE_NAME))
    }

    /// Save config to a TOML file.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Remote that branches are pushed to.
    #[serde(default = "default_remote")]
    pub default_remote: String,

    /// Override for the operation state directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_remote: default_remote(),
            state_dir: None,
        }
    }
}

fn default_remote() -> String {
    "origin".into()
}

const fn default_true() -> bool {
    true
}

/// Defaults for `branch` and `multi-branch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchConfig {
    /// Run commit and push hooks.
    #[serde(default = "default_true")]
    pub verify: bool,

    /// Keep a freshly created branch when a later step fails.
    #[serde(default)]
    pub keep_branch_on_failure: bool,

    /// Owner that receives files matching no CODEOWNERS rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_owner: Option<String>,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            verify: true,
            keep_branch_on_failure: false,
            default_owner: None,
        }
    }
}

/// Pull request settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrConfig {
    /// Repo-relative path of a PR body template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.default_remote, "origin");
        assert!(config.branch.verify);
        assert!(!config.branch.keep_branch_on_failure);
        assert!(config.branch.default_owner.is_none());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(Config::FILE_NAME);

        let config = Config {
            general: GeneralConfig {
                default_remote: "upstream".into(),
                state_dir: Some("/tmp/codesplit-state".into()),
            },
            branch: BranchConfig {
                verify: false,
                keep_branch_on_failure: true,
                default_owner: Some("@platform".into()),
            },
            pr: PrConfig {
                template: Some(".github/pr.md".into()),
            },
        };

        config.save(&path).unwrap();
        let loaded = Config::load_for_workdir(temp.path()).unwrap();

        assert_eq!(loaded.general.default_remote, "upstream");
        assert!(!loaded.branch.verify);
        assert!(loaded.branch.keep_branch_on_failure);
        assert_eq!(loaded.branch.default_owner.as_deref(), Some("@platform"));
        assert_eq!(loaded.pr.template, Some(PathBuf::from(".github/pr.md")));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(Config::FILE_NAME);
        fs::write(&path, "[branch]\ndefault_owner = \"@core\"\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.general.default_remote, "origin");
        assert!(loaded.branch.verify);
        assert_eq!(loaded.branch.default_owner.as_deref(), Some("@core"));
    }

    #[test]
    fn test_missing_config_returns_default() {
        let config = Config::load("/nonexistent/path/.codesplit.toml").unwrap();
        assert_eq!(config.general.default_remote, "origin");
    }
}
