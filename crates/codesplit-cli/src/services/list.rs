//! List service: changed files grouped by owner.

use anyhow::Result;
use codesplit_core::{OwnerFilter, OwnerResolver, OwnershipMap};
use codesplit_git::GitOps;
use serde::Serialize;

/// Files one owner would get on its branch.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerFiles {
    pub owner: String,
    pub files: Vec<String>,
}

/// Listing of the current change-set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OwnerListing {
    pub owners: Vec<OwnerFiles>,
    /// Changed files no CODEOWNERS rule owns.
    pub unowned: Vec<String>,
}

impl OwnerListing {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty() && self.unowned.is_empty()
    }
}

/// Service for listing ownership of changed files.
pub struct ListService<'a, G: GitOps, R: OwnerResolver + ?Sized> {
    git: &'a G,
    resolver: &'a R,
}

impl<'a, G: GitOps, R: OwnerResolver + ?Sized> ListService<'a, G, R> {
    #[must_use]
    pub const fn new(git: &'a G, resolver: &'a R) -> Self {
        Self { git, resolver }
    }

    /// Group changed files by owner.
    ///
    /// `owner` narrows the listing to one owner (no unowned section);
    /// otherwise `filter` selects which owners are shown.
    pub fn list(&self, owner: Option<&str>, filter: &OwnerFilter) -> Result<OwnerListing> {
        let changed = self.git.changed_files()?;
        let map = OwnershipMap::build(&changed, self.resolver, None);

        if let Some(owner) = owner {
            let files = map.files_for(owner);
            let owners = if files.is_empty() {
                Vec::new()
            } else {
                vec![OwnerFiles {
                    owner: owner.to_string(),
                    files,
                }]
            };
            return Ok(OwnerListing {
                owners,
                unowned: Vec::new(),
            });
        }

        let owners = filter
            .apply(map.owners())
            .into_iter()
            .map(|owner| OwnerFiles {
                files: map.files_for(&owner),
                owner,
            })
            .collect();
        Ok(OwnerListing {
            owners,
            unowned: map.unowned().to_vec(),
        })
    }
}
