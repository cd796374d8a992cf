//! CODEOWNERS parsing and per-owner file grouping.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::Result;
use crate::traits::OwnerResolver;

/// Where CODEOWNERS is looked up, in order.
pub const CODEOWNERS_LOCATIONS: &[&str] = &[".github/CODEOWNERS", "CODEOWNERS", "docs/CODEOWNERS"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, Clone)]
struct Rule {
    source: String,
    patterns: Vec<Pattern>,
    owners: Vec<String>,
}

impl Rule {
    fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let source = tokens.next()?.to_string();
        let owners = tokens
            .take_while(|t| !t.starts_with('#'))
            .map(str::to_string)
            .collect();

        let patterns = match translate(&source)
            .iter()
            .map(|p| Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()
        {
            Ok(patterns) => patterns,
            Err(e) => {
                tracing::warn!(pattern = %source, error = %e, "skipping invalid pattern");
                return None;
            }
        };

        Some(Self {
            source,
            patterns,
            owners,
        })
    }

    fn matches(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.matches_with(path, MATCH_OPTIONS))
    }
}

/// Turn a gitignore-style CODEOWNERS pattern into glob patterns.
///
/// A leading or inner `/` anchors to the root; otherwise the pattern matches
/// at any depth. Every match also covers the paths beneath it, and a trailing
/// `/` restricts the rule to those.
fn translate(pattern: &str) -> Vec<String> {
    let (body, dir_only) = match pattern.strip_suffix('/') {
        Some(body) => (body, true),
        None => (pattern, false),
    };
    let anchored = body.contains('/');
    let body = body.trim_start_matches('/');
    let base = if anchored || body.starts_with("**") {
        body.to_string()
    } else {
        format!("**/{body}")
    };

    let beneath = if base.ends_with("/**") {
        base.clone()
    } else {
        format!("{base}/**")
    };
    if dir_only || base == beneath {
        vec![beneath]
    } else {
        vec![base, beneath]
    }
}

/// A parsed CODEOWNERS file.
///
/// The last matching rule decides a path's owners; a rule without owners
/// leaves its matches unowned.
#[derive(Debug, Clone, Default)]
pub struct CodeOwners {
    rules: Vec<Rule>,
    source: Option<PathBuf>,
}

impl CodeOwners {
    /// Parse CODEOWNERS content.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let rules = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(Rule::parse)
            .collect();
        Self {
            rules,
            source: None,
        }
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    /// Returns error if the file can't be read.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut owners = Self::parse(&content);
        owners.source = Some(path.to_path_buf());
        Ok(owners)
    }

    /// Find and load the CODEOWNERS file of a working directory.
    ///
    /// Returns an empty resolver when none of the conventional locations
    /// holds a file.
    ///
    /// # Errors
    /// Returns error if a located file can't be read.
    pub fn locate(workdir: &Path) -> Result<Self> {
        for location in CODEOWNERS_LOCATIONS {
            let path = workdir.join(location);
            if path.is_file() {
                tracing::debug!(path = %path.display(), "using CODEOWNERS");
                return Self::load(&path);
            }
        }
        tracing::debug!(workdir = %workdir.display(), "no CODEOWNERS file found");
        Ok(Self::default())
    }

    /// The file these rules came from, if loaded from disk.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Whether no rules were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl OwnerResolver for CodeOwners {
    fn owners_of(&self, path: &str) -> Vec<String> {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matches(path))
            .map(|rule| {
                tracing::trace!(%path, rule = %rule.source, "matched CODEOWNERS rule");
                rule.owners.clone()
            })
            .unwrap_or_default()
    }
}

/// Changed files grouped by owner.
///
/// Files owned through a CODEOWNERS rule and files attributed to the default
/// owner are kept apart so summaries can tell them apart.
#[derive(Debug, Clone, Default)]
pub struct OwnershipMap {
    owners: Vec<String>,
    by_rule: HashMap<String, Vec<String>>,
    unowned: Vec<String>,
    default_owner: Option<String>,
}

impl OwnershipMap {
    /// Resolve `files` against `resolver`.
    ///
    /// With a `default_owner`, files no rule owns are attributed to it and it
    /// joins the owner universe (last, unless already present).
    pub fn build<R>(files: &[String], resolver: &R, default_owner: Option<&str>) -> Self
    where
        R: OwnerResolver + ?Sized,
    {
        let mut map = Self {
            default_owner: default_owner.map(str::to_string),
            ..Self::default()
        };

        for file in files {
            let owners = resolver.owners_of(file);
            if owners.is_empty() {
                map.unowned.push(file.clone());
                continue;
            }
            for owner in owners {
                let owned = map.by_rule.entry(owner.clone()).or_insert_with(|| {
                    map.owners.push(owner.clone());
                    Vec::new()
                });
                if !owned.contains(file) {
                    owned.push(file.clone());
                }
            }
        }

        if let Some(default) = &map.default_owner {
            if !map.unowned.is_empty() && !map.owners.contains(default) {
                map.owners.push(default.clone());
            }
        }
        map
    }

    /// Owner universe in first-appearance order.
    #[must_use]
    pub fn owners(&self) -> &[String] {
        &self.owners
    }

    /// Files with no rule owner.
    #[must_use]
    pub fn unowned(&self) -> &[String] {
        &self.unowned
    }

    #[must_use]
    pub fn default_owner(&self) -> Option<&str> {
        self.default_owner.as_deref()
    }

    /// Files `owner` owns through CODEOWNERS rules.
    #[must_use]
    pub fn files_by_rule(&self, owner: &str) -> &[String] {
        self.by_rule.get(owner).map_or(&[], Vec::as_slice)
    }

    /// Files attributed to `owner` only because it is the default owner.
    #[must_use]
    pub fn files_by_default(&self, owner: &str) -> &[String] {
        if self.default_owner.as_deref() == Some(owner) {
            &self.unowned
        } else {
            &[]
        }
    }

    /// Every file that goes on `owner`'s branch, sorted.
    #[must_use]
    pub fn files_for(&self, owner: &str) -> Vec<String> {
        let mut files: Vec<String> = self
            .files_by_rule(owner)
            .iter()
            .chain(self.files_by_default(owner))
            .cloned()
            .collect();
        files.sort();
        files.dedup();
        files
    }

    /// Whether any owner (rule or default) has files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
