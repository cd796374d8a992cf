//! `codesplit branch` command - Commit one owner's changed files to a branch.

use anyhow::{Context, Result, bail};
use codesplit_core::BranchName;

use super::BranchCommand;
use crate::commands::utils;
use crate::interrupt;
use crate::output;
use crate::services::{
    BranchOutcome, BranchRequest, BranchResult, BranchService, Cleanup, recovery_hint,
};

/// Run the branch command.
pub fn run(args: &BranchCommand) -> Result<()> {
    let ws = utils::open_workspace()?;
    utils::ensure_on_branch(&ws.repo)?;

    let branch_name = BranchName::new(args.branch.as_str()).context("Invalid branch name")?;
    let owners = utils::load_codeowners(&ws)?;
    let mut options = utils::branch_options(&args.flags, &ws)?;
    options.is_default_owner = args.default_owner;
    let gh = utils::pr_client(&ws, &options);

    interrupt::install(ws.store.clone());

    let service = BranchService::new(&ws.repo, &owners, gh.as_ref(), &ws.store);
    let request = BranchRequest {
        owner: &args.owner,
        branch_name: &branch_name,
        commit_message: &args.message,
    };
    let run = service.run(&request, &options)?;
    let result = &run.result;

    match &result.outcome {
        BranchOutcome::Succeeded => {
            print_result(result);
            Ok(())
        }
        BranchOutcome::Skipped => {
            output::warn(&format!(
                "No changed files owned by {}; nothing to do",
                result.owner
            ));
            Ok(())
        }
        BranchOutcome::Rejected(message) => bail!("{message}"),
        BranchOutcome::Failed(message) => {
            output::error(message);
            if let Some(cleanup) = &result.cleanup {
                output::detail(&format!("  {}", describe_cleanup(&result.branch_name, cleanup)));
            }
            match &run.operation_id {
                Some(id) => bail!("Branch operation failed; {}", recovery_hint(id)),
                None => bail!("Branch operation failed"),
            }
        }
    }
}

/// Print a successful owner branch with its files and PR.
pub fn print_result(result: &BranchResult) {
    output::success(&format!(
        "{} → {} ({})",
        output::owner(&result.owner),
        result.branch_name,
        output::count(result.files.len(), "file")
    ));
    for file in &result.files {
        if result.default_files.contains(file) {
            output::detail(&format!("    {file} (default owner)"));
        } else {
            output::detail(&format!("    {file}"));
        }
    }
    if result.pushed {
        output::detail(&format!("    pushed {}", result.branch_name));
    }
    if let Some(pr) = &result.pr {
        output::detail(&format!("    pull request {}", output::pr_ref(pr.number)));
        output::essential(&pr.url);
    }
    if let Some(error) = &result.pr_error {
        output::warn(&format!("Branch {} is fine but {error}", result.branch_name));
    }
}

/// What rollback left behind, for the user.
pub fn describe_cleanup(branch: &str, cleanup: &Cleanup) -> String {
    match cleanup {
        Cleanup::Deleted { restored: true } => {
            format!("deleted '{branch}'; its files are back in your working tree, unstaged")
        }
        Cleanup::Deleted { restored: false } => format!("deleted '{branch}'"),
        Cleanup::Kept { restored: true } => {
            format!("kept '{branch}'; its files are also back in your working tree")
        }
        Cleanup::Kept { restored: false } => format!("kept '{branch}'"),
        Cleanup::RestoreFailed(e) => {
            format!("kept '{branch}' because its files could not be restored: {e}")
        }
        Cleanup::DeleteFailed(e) => {
            format!("files restored, but '{branch}' could not be deleted: {e}")
        }
        Cleanup::Existing => format!("'{branch}' existed before and was left as is"),
        Cleanup::CheckoutFailed(e) => {
            format!("could not return to the original branch ({e}); '{branch}' left in place")
        }
    }
}
