//! # codesplit-core
//!
//! Core library for codesplit: the durable operation record that makes
//! multi-branch runs recoverable, CODEOWNERS-based ownership resolution, owner
//! filters and the branch naming rules shared by every command.

pub mod branch_name;
pub mod config;
mod error;
pub mod filter;
pub mod operation;
pub mod owners;
pub mod state;
pub mod traits;

pub use branch_name::{BranchName, owner_branch_name, owner_commit_message, sanitize_owner};
pub use config::Config;
pub use error::{Error, Result};
pub use filter::OwnerFilter;
pub use operation::{
    BranchPatch, BranchRecord, OperationKind, OperationOptions, OperationRecord, Stage,
};
pub use owners::{CodeOwners, OwnershipMap};
pub use state::FileOperationStore;
pub use traits::{OperationStore, OwnerResolver};
