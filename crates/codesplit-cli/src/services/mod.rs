//! Service layer for business logic with dependency injection.
//!
//! Services are generic over the git, storage, ownership and PR traits so the
//! branch state machine can be tested against mock implementations.

pub mod branch;
pub mod list;
pub mod multi_branch;
pub mod recover;

#[cfg(test)]
pub mod test_mocks;

pub use branch::{
    BranchOptions, BranchOutcome, BranchRequest, BranchResult, BranchService, Cleanup,
    recovery_hint,
};
pub use list::{ListService, OwnerListing};
pub use multi_branch::{
    MultiBranchOutcome, MultiBranchReport, MultiBranchRequest, MultiBranchService,
};
pub use recover::{RecoverService, RecoveryReport, Selection};
