//! # codesplit-git
//!
//! Git capability layer for codesplit. Read-only queries and ref edits go
//! through git2-rs; anything that should behave exactly like the user's own
//! git (commit hooks, push progress, working-tree checkout) shells out to the
//! system `git` binary.

mod error;
mod repository;
mod traits;

pub use error::{Error, Result};
pub use git2::Oid;
pub use repository::{PushOptions, Repository};
pub use traits::GitOps;
