//! Include / ignore filters over owner identifiers.

use glob::Pattern;

use crate::error::{Error, Result};

/// Which owners a multi-branch run processes.
#[derive(Debug, Clone, Default)]
pub enum OwnerFilter {
    /// Every owner.
    #[default]
    All,
    /// Only owners matching one of the patterns.
    Include(Vec<Pattern>),
    /// Every owner except those matching one of the patterns.
    Ignore(Vec<Pattern>),
}

impl OwnerFilter {
    /// Build a filter from the raw `--include` / `--ignore` values.
    ///
    /// Each value is a comma-separated list of glob patterns.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOptions`] if both are given and
    /// [`Error::InvalidPattern`] for a malformed pattern.
    pub fn from_args(include: Option<&str>, ignore: Option<&str>) -> Result<Self> {
        match (include, ignore) {
            (Some(_), Some(_)) => Err(Error::InvalidOptions(
                "--include and --ignore cannot be used together".into(),
            )),
            (Some(list), None) => Ok(Self::Include(parse_patterns(list)?)),
            (None, Some(list)) => Ok(Self::Ignore(parse_patterns(list)?)),
            (None, None) => Ok(Self::All),
        }
    }

    /// Whether `owner` passes the filter.
    #[must_use]
    pub fn allows(&self, owner: &str) -> bool {
        match self {
            Self::All => true,
            Self::Include(patterns) => patterns.iter().any(|p| p.matches(owner)),
            Self::Ignore(patterns) => !patterns.iter().any(|p| p.matches(owner)),
        }
    }

    /// The owners of `owners` that pass the filter, order preserved.
    #[must_use]
    pub fn apply(&self, owners: &[String]) -> Vec<String> {
        owners
            .iter()
            .filter(|owner| self.allows(owner))
            .cloned()
            .collect()
    }
}

fn parse_patterns(list: &str) -> Result<Vec<Pattern>> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            Pattern::new(p).map_err(|e| Error::InvalidPattern {
                pattern: p.to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn owners() -> Vec<String> {
        ["@frontend", "@backend", "@org/backend-infra", "dev@example.com"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    #[test]
    fn test_no_filter_keeps_all() {
        let filter = OwnerFilter::from_args(None, None).unwrap();
        assert_eq!(filter.apply(&owners()), owners());
    }

    #[test]
    fn test_include_wildcard() {
        let filter = OwnerFilter::from_args(Some("*backend*"), None).unwrap();
        assert_eq!(filter.apply(&owners()), vec!["@backend", "@org/backend-infra"]);
    }

    #[test]
    fn test_include_exact_and_list() {
        let filter = OwnerFilter::from_args(Some("@frontend, dev@example.com"), None).unwrap();
        assert_eq!(filter.apply(&owners()), vec!["@frontend", "dev@example.com"]);
    }

    #[test]
    fn test_ignore() {
        let filter = OwnerFilter::from_args(None, Some("@org/*,*@example.com")).unwrap();
        assert_eq!(filter.apply(&owners()), vec!["@frontend", "@backend"]);
    }

    #[test]
    fn test_include_and_ignore_rejected() {
        let err = OwnerFilter::from_args(Some("*"), Some("@x")).unwrap_err();
        assert!(matches!(err, Error::InvalidOptions(_)));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = OwnerFilter::from_args(Some("[abc"), None).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_filter_can_empty_the_set() {
        let filter = OwnerFilter::from_args(Some("@nobody"), None).unwrap();
        assert!(filter.apply(&owners()).is_empty());
    }
}
