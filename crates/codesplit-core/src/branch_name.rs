//! Branch naming for owner-scoped branches.
//!
//! Every branch this tool creates is `{base}/{sanitized owner}`. [`BranchName`]
//! guarantees the result is a ref name git will accept and that it carries no
//! characters that would be dangerous when echoed into a shell command in
//! recovery instructions.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

/// Characters git refuses anywhere in a ref name.
const GIT_FORBIDDEN: &[char] = &[' ', '~', '^', ':', '?', '*', '['];

/// Shell metacharacters rejected on top of git's own rules.
const SHELL_META: &[char] = &[
    '$', ';', '|', '&', '>', '<', '`', '\\', '"', '\'', '(', ')', '{', '}', '!',
];

/// Substrings git refuses, with the message reported for each.
const FORBIDDEN_SEQUENCES: &[(&str, &str)] = &[
    ("..", "cannot contain '..'"),
    ("//", "cannot contain '//'"),
    ("@{", "cannot contain '@{'"),
    ("/.", "component cannot start with '.'"),
    (".lock/", "component cannot end with '.lock'"),
];

/// A validated git branch name.
///
/// # Examples
///
/// ```
/// use codesplit_core::BranchName;
///
/// assert!(BranchName::new("feature/x/frontend").is_ok());
/// assert!(BranchName::new("feature/x/dev@example-com").is_ok());
///
/// assert!(BranchName::new("feature/x/").is_err());
/// assert!(BranchName::new("../escape").is_err());
/// assert!(BranchName::new("x;rm -rf").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBranchName`] if the name violates git's
    /// branch naming rules or contains shell metacharacters.
    pub fn new(name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        if let Err(reason) = check(&name) {
            return Err(Error::InvalidBranchName { name, reason });
        }
        Ok(Self(name))
    }

    /// Get the branch name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the `BranchName` and return the inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for BranchName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for BranchName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BranchName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl Serialize for BranchName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BranchName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

fn check(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("branch name cannot be empty".into());
    }
    if name == "@" {
        return Err("branch name cannot be '@'".into());
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err("branch name cannot start or end with '.'".into());
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err("branch name cannot start or end with '/'".into());
    }
    #[allow(clippy::case_sensitive_file_extension_comparisons)]
    if name.ends_with(".lock") {
        return Err("branch name cannot end with '.lock'".into());
    }

    if let Some(c) = name.chars().find(char::is_ascii_control) {
        return Err(format!("branch name cannot contain control character {c:?}"));
    }
    if let Some(c) = name.chars().find(|c| GIT_FORBIDDEN.contains(c)) {
        return Err(format!("branch name cannot contain '{c}'"));
    }
    if let Some(c) = name.chars().find(|c| SHELL_META.contains(c)) {
        return Err(format!("branch name cannot contain shell metacharacter '{c}'"));
    }

    // Suffix '/' so a trailing ".lock" component is caught by the table too.
    let with_slash = format!("{name}/");
    for (sequence, reason) in FORBIDDEN_SEQUENCES {
        if with_slash.contains(sequence) {
            return Err(format!("branch name {reason}"));
        }
    }

    Ok(())
}

/// Turn an owner identifier into a branch-name segment.
///
/// One leading `@` is dropped and every character outside `[A-Za-z0-9-_@]`
/// becomes `-`. Distinct owners can map to the same segment
/// (`@team.a` and `@team-a`); callers that build several names must check for
/// collisions.
#[must_use]
pub fn sanitize_owner(owner: &str) -> String {
    let trimmed = owner.strip_prefix('@').unwrap_or(owner);
    trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Branch name used for `owner` under `base`: `{base}/{sanitized owner}`.
///
/// # Errors
/// Returns [`Error::InvalidBranchName`] if the combined name is not a valid ref.
pub fn owner_branch_name(base: &str, owner: &str) -> Result<BranchName, Error> {
    BranchName::new(format!("{base}/{}", sanitize_owner(owner)))
}

/// Commit message used for `owner`: `{base} - {owner}` with the raw owner id.
#[must_use]
pub fn owner_commit_message(base: &str, owner: &str) -> String {
    format!("{base} - {owner}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rejected(name: &str) -> bool {
        matches!(BranchName::new(name), Err(Error::InvalidBranchName { .. }))
    }

    #[test]
    fn test_accepts_owner_branches() {
        for name in [
            "main",
            "feature/x",
            "feature/x/frontend",
            "release-2024/org-platform_team",
            "fix/dev@example-com",
            "v1.0.0",
        ] {
            assert!(BranchName::new(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_rejects_structural_violations() {
        for name in [
            "",
            "@",
            ".hidden",
            "trailing.",
            "/leading",
            "trailing/",
            "feature//x",
            "feature/.x",
            "feature..x",
            "../etc/passwd",
            "feature.lock",
            "feature.lock/x",
            "name@{1}",
        ] {
            assert!(rejected(name), "{name:?}");
        }
    }

    #[test]
    fn test_rejects_forbidden_characters() {
        for c in GIT_FORBIDDEN.iter().chain(SHELL_META) {
            let name = format!("feature{c}x");
            assert!(rejected(&name), "char: {c}");
        }
        assert!(rejected("feature\tx"));
        assert!(rejected("feature\nx"));
    }

    #[test]
    fn test_error_carries_reason() {
        let err = BranchName::new("feature x").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("feature x"));
        assert!(message.contains("' '"));
    }

    #[test]
    fn test_sanitize_owner() {
        assert_eq!(sanitize_owner("@frontend"), "frontend");
        assert_eq!(sanitize_owner("@org/platform-team"), "org-platform-team");
        assert_eq!(sanitize_owner("dev@example.com"), "dev@example-com");
        assert_eq!(sanitize_owner("@@double"), "@double");
        assert_eq!(sanitize_owner("plain_owner"), "plain_owner");
    }

    #[test]
    fn test_sanitize_collisions_are_possible() {
        assert_eq!(sanitize_owner("@team.a"), sanitize_owner("@team-a"));
    }

    #[test]
    fn test_owner_branch_name() {
        let name = owner_branch_name("feature/x", "@frontend").unwrap();
        assert_eq!(name, "feature/x/frontend");

        let team = owner_branch_name("feature/x", "@acme/backend").unwrap();
        assert_eq!(team.as_str(), "feature/x/acme-backend");

        assert!(owner_branch_name("bad base", "@frontend").is_err());
    }

    #[test]
    fn test_owner_commit_message_keeps_raw_owner() {
        assert_eq!(
            owner_commit_message("update", "@acme/backend"),
            "update - @acme/backend"
        );
    }

    #[test]
    fn test_serde_validates() {
        let name = BranchName::new("feature/x/frontend").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"feature/x/frontend\"");

        let parsed: BranchName = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, name);

        let bad: Result<BranchName, _> = serde_json::from_str("\"a..b\"");
        assert!(bad.is_err());
    }
}
