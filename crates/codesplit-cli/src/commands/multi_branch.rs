//! `codesplit multi-branch` command - One branch per owner of the changes.

use anyhow::{Result, bail};

use super::MultiBranchCommand;
use super::branch::{describe_cleanup, print_result};
use crate::commands::utils;
use crate::interrupt;
use crate::output;
use crate::services::{
    MultiBranchOutcome, MultiBranchReport, MultiBranchRequest, MultiBranchService,
};

/// Run the multi-branch command.
pub fn run(args: &MultiBranchCommand) -> Result<()> {
    let ws = utils::open_workspace()?;
    utils::ensure_on_branch(&ws.repo)?;

    let owners = utils::load_codeowners(&ws)?;
    let options = utils::branch_options(&args.flags, &ws)?;
    let gh = utils::pr_client(&ws, &options);
    let default_owner = args
        .default_owner
        .as_deref()
        .or(ws.config.branch.default_owner.as_deref());

    interrupt::install(ws.store.clone());

    let service = MultiBranchService::new(&ws.repo, &owners, gh.as_ref(), &ws.store);
    let request = MultiBranchRequest {
        base_branch: &args.branch,
        base_message: &args.message,
        default_owner,
        include: args.include.as_deref(),
        ignore: args.ignore.as_deref(),
    };

    match service.run(&request, &options)? {
        MultiBranchOutcome::NoOwners {
            unowned,
            filtered_out,
        } => {
            if filtered_out > 0 {
                output::warn(&format!(
                    "No owners left to process: all {} were filtered out",
                    output::count(filtered_out, "owner")
                ));
            } else {
                output::warn("No owners to process: no codeowners found for the changed files");
            }
            print_unowned(&unowned);
            Ok(())
        }
        MultiBranchOutcome::Completed(report) => print_report(&report),
    }
}

fn print_unowned(unowned: &[String]) {
    if unowned.is_empty() {
        return;
    }
    output::info(&format!(
        "{} without an owner:",
        output::count(unowned.len(), "file")
    ));
    for file in unowned {
        output::detail(&format!("    {file}"));
    }
}

fn skip_reason(claimed_by: &[String]) -> String {
    if claimed_by.is_empty() {
        "no changed files".to_string()
    } else {
        let branches: Vec<String> = claimed_by.iter().map(|b| format!("'{b}'")).collect();
        format!("its files already went to {}", branches.join(", "))
    }
}

fn print_report(report: &MultiBranchReport) -> Result<()> {
    for result in report.succeeded() {
        if result.skipped() {
            output::info(&format!(
                "{}: {}, skipped",
                output::owner(&result.owner),
                skip_reason(&result.claimed_by)
            ));
        } else {
            print_result(result);
        }
    }

    let failed: Vec<_> = report.failed().collect();
    for result in &failed {
        output::error(&format!(
            "{} → {}: {}",
            output::owner(&result.owner),
            result.branch_name,
            result.error().unwrap_or("failed")
        ));
        if let Some(cleanup) = &result.cleanup {
            output::detail(&format!("    {}", describe_cleanup(&result.branch_name, cleanup)));
        }
    }

    if report.default_owner.is_none() {
        print_unowned(&report.unowned);
    }

    output::hr();
    let done = report.results.len() - failed.len() - report.skipped().count();
    output::info(&format!(
        "{done} succeeded, {} failed, {} skipped; back on '{}'",
        failed.len(),
        report.skipped().count(),
        report.original_branch
    ));
    if report.pr_requested {
        output::info(&format!(
            "{} opened, {} failed",
            output::count(report.prs_created(), "pull request"),
            report.prs_failed()
        ));
    }

    if !failed.is_empty() {
        bail!(
            "{} of {} failed",
            output::count(failed.len(), "owner"),
            report.results.len()
        );
    }
    Ok(())
}
