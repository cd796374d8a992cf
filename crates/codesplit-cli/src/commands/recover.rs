//! `codesplit recover` command - Roll back an interrupted or failed operation.

use anyhow::{Context, Result, bail};
use codesplit_core::OperationRecord;
use inquire::Select;
use serde::Serialize;

use super::RecoverCommand;
use crate::commands::utils;
use crate::output;
use crate::services::{RecoverService, RecoveryReport, Selection};

#[derive(Serialize)]
struct RecordSummary<'a> {
    id: &'a str,
    kind: String,
    stage: String,
    original_branch: &'a str,
    timestamp: String,
    branches: Vec<&'a str>,
    error: Option<&'a str>,
}

impl<'a> From<&'a OperationRecord> for RecordSummary<'a> {
    fn from(record: &'a OperationRecord) -> Self {
        Self {
            id: &record.id,
            kind: record.kind.to_string(),
            stage: record.current_stage.to_string(),
            original_branch: &record.original_branch,
            timestamp: record.timestamp.to_rfc3339(),
            branches: record.branches.iter().map(|b| b.name.as_str()).collect(),
            error: record.error.as_deref(),
        }
    }
}

/// Run the recover command.
pub fn run(args: &RecoverCommand) -> Result<()> {
    let ws = utils::open_workspace()?;
    let service = RecoverService::new(&ws.repo, &ws.store);

    if args.list {
        let records = service.incomplete()?;
        return print_list(&records, args.json);
    }

    let record = match service.select(args.id.as_deref(), args.auto)? {
        Selection::Record(record) => *record,
        Selection::Nothing => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&RecoveryReport::default())?);
            } else {
                output::info("Nothing to recover");
            }
            return Ok(());
        }
        Selection::NeedsChoice(records) => choose(records)?,
    };

    if !args.json {
        output::info(&format!(
            "Recovering {} operation {} (stage {})",
            record.kind, record.id, record.current_stage
        ));
    }
    let report = service.recover(&record, args.keep_branches)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn choose(records: Vec<OperationRecord>) -> Result<OperationRecord> {
    if !console::user_attended() {
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        bail!(
            "Several operations need recovery: {}\n\
             run `codesplit recover --id <id>` or `codesplit recover --auto`",
            ids.join(", ")
        );
    }

    let labels: Vec<String> = records.iter().map(label).collect();
    let choice = Select::new("Select the operation to recover:", labels)
        .with_help_message("Records are listed newest first")
        .raw_prompt()
        .context("Failed to get operation selection")?;

    records
        .into_iter()
        .nth(choice.index)
        .context("Selected operation disappeared")
}

fn label(record: &OperationRecord) -> String {
    format!(
        "{} {} from '{}' at {} ({}, {})",
        record.id,
        record.kind,
        record.original_branch,
        record.timestamp.format("%Y-%m-%d %H:%M:%S"),
        record.current_stage,
        output::count(record.branches.len(), "branch record")
    )
}

fn print_list(records: &[OperationRecord], json: bool) -> Result<()> {
    if json {
        let summaries: Vec<RecordSummary<'_>> = records.iter().map(RecordSummary::from).collect();
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if records.is_empty() {
        output::info("No incomplete operations");
        return Ok(());
    }
    for record in records {
        output::essential(&label(record));
        for branch in &record.branches {
            let mut flags = Vec::new();
            if branch.created {
                flags.push("created");
            }
            if branch.committed {
                flags.push("committed");
            }
            if branch.pushed {
                flags.push("pushed");
            }
            output::detail(&format!(
                "    {} [{}] {}",
                branch.name,
                flags.join(", "),
                branch.error.as_deref().unwrap_or("")
            ));
        }
        if let Some(error) = &record.error {
            output::detail(&format!("    error: {error}"));
        }
    }
    Ok(())
}

fn print_report(report: &RecoveryReport) {
    if let Some(branch) = &report.checked_out {
        output::success(&format!("Checked out '{branch}'"));
    }
    for branch in &report.restored {
        output::success(&format!("Restored unpushed files from '{branch}'"));
    }
    for branch in &report.deleted {
        output::success(&format!("Deleted '{branch}'"));
    }
    for branch in &report.already_absent {
        output::detail(&format!("  '{branch}' was already gone"));
    }
    for branch in &report.kept {
        output::warn(&format!("Kept '{branch}'"));
    }
    for branch in &report.conflicted {
        output::warn(&format!(
            "Kept '{branch}': its files have uncommitted changes, restore them by hand with \
             `git checkout {branch} -- <paths>`"
        ));
    }
    output::success(&format!("Recovered operation {}", report.operation_id));
}
