//! `codesplit list` command - Show changed files grouped by owner.

use anyhow::Result;
use codesplit_core::OwnerFilter;

use super::ListCommand;
use crate::commands::utils;
use crate::output;
use crate::services::{ListService, OwnerListing};

/// Run the list command.
pub fn run(args: &ListCommand) -> Result<()> {
    let ws = utils::open_workspace()?;
    let owners = utils::load_codeowners(&ws)?;
    let filter = OwnerFilter::from_args(args.include.as_deref(), None)?;

    let service = ListService::new(&ws.repo, &owners);
    let listing = service.list(args.owner.as_deref(), &filter)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        print_listing(&listing, args.owner.as_deref());
    }
    Ok(())
}

fn print_listing(listing: &OwnerListing, owner: Option<&str>) {
    if listing.is_empty() {
        match owner {
            Some(owner) => output::info(&format!("No changed files owned by {owner}")),
            None => output::info("No changed files"),
        }
        return;
    }

    for entry in &listing.owners {
        output::essential(&format!(
            "{} ({})",
            output::owner(&entry.owner),
            output::count(entry.files.len(), "file")
        ));
        for file in &entry.files {
            output::essential(&format!("    {file}"));
        }
    }

    if !listing.unowned.is_empty() {
        output::hr();
        output::essential(&format!(
            "Unowned ({})",
            output::count(listing.unowned.len(), "file")
        ));
        for file in &listing.unowned {
            output::essential(&format!("    {file}"));
        }
    }
}
