//! Command-line interface definition.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

pub mod branch;
pub mod completions;
pub mod list;
pub mod multi_branch;
pub mod recover;
pub mod utils;

/// Split a monorepo change-set into one branch per CODEOWNERS owner.
#[derive(Debug, Parser)]
#[command(name = "codesplit", version, about, propagate_version = true)]
pub struct Cli {
    /// Show debug logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print essential output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Commit one owner's changed files to a branch.
    Branch(BranchCommand),

    /// Create one branch per owner of the changed files.
    #[command(name = "multi-branch")]
    MultiBranch(MultiBranchCommand),

    /// Roll back an interrupted or failed operation.
    Recover(RecoverCommand),

    /// Show changed files grouped by owner.
    #[command(alias = "ls")]
    List(ListCommand),

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Push, PR and commit flags shared by `branch` and `multi-branch`.
#[derive(Debug, Clone, Args)]
#[allow(clippy::struct_excessive_bools)] // CLI flags map directly to fields
pub struct BranchFlags {
    /// Push the branch after committing.
    #[arg(short, long)]
    pub push: bool,

    /// Remote to push to [default: general.default_remote or "origin"].
    #[arg(short, long)]
    pub remote: Option<String>,

    /// Remote branch name to push to.
    #[arg(short, long)]
    pub upstream: Option<String>,

    /// Force-push.
    #[arg(short, long)]
    pub force: bool,

    /// Add a commit to an existing branch instead of creating one.
    #[arg(short, long)]
    pub append: bool,

    /// Skip commit and push hooks.
    #[arg(short = 'n', long)]
    pub no_verify: bool,

    /// Keep a newly created branch when a later step fails.
    #[arg(short, long)]
    pub keep_branch_on_failure: bool,

    /// Open a pull request after pushing.
    #[arg(long)]
    pub pr: bool,

    /// Open a draft pull request after pushing.
    #[arg(long)]
    pub draft_pr: bool,
}

#[derive(Debug, Clone, Args)]
pub struct BranchCommand {
    /// Owner whose files go on the branch (e.g. @org/frontend).
    #[arg(short, long)]
    pub owner: String,

    /// Branch name.
    #[arg(short, long)]
    pub branch: String,

    /// Commit message.
    #[arg(short, long)]
    pub message: String,

    /// Treat the owner as the default owner, adding files no rule owns.
    #[arg(long)]
    pub default_owner: bool,

    #[command(flatten)]
    pub flags: BranchFlags,
}

#[derive(Debug, Clone, Args)]
pub struct MultiBranchCommand {
    /// Base branch name; each owner gets `<branch>/<owner>`.
    #[arg(short, long)]
    pub branch: String,

    /// Base commit message; each owner gets `<message> - <owner>`.
    #[arg(short, long)]
    pub message: String,

    /// Owner receiving files no CODEOWNERS rule owns.
    #[arg(short, long)]
    pub default_owner: Option<String>,

    /// Only process owners matching these comma-separated patterns.
    #[arg(short, long)]
    pub include: Option<String>,

    /// Skip owners matching these comma-separated patterns.
    #[arg(long)]
    pub ignore: Option<String>,

    #[command(flatten)]
    pub flags: BranchFlags,
}

#[derive(Debug, Clone, Args)]
#[allow(clippy::struct_excessive_bools)] // CLI flags map directly to fields
pub struct RecoverCommand {
    /// List incomplete operations and exit.
    #[arg(long)]
    pub list: bool,

    /// Operation id to recover.
    #[arg(long, conflicts_with = "list")]
    pub id: Option<String>,

    /// Pick the most recent operation without prompting.
    #[arg(long, conflicts_with = "id")]
    pub auto: bool,

    /// Leave the branches the operation created in place.
    #[arg(long)]
    pub keep_branches: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ListCommand {
    /// Only show this owner's files.
    #[arg(short, long)]
    pub owner: Option<String>,

    /// Only show owners matching these comma-separated patterns.
    #[arg(short, long, conflicts_with = "owner")]
    pub include: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_multi_branch() {
        let cli = Cli::try_parse_from([
            "codesplit",
            "multi-branch",
            "-b",
            "feature/x",
            "-m",
            "update",
            "-i",
            "*backend*",
            "-p",
            "--draft-pr",
        ])
        .unwrap();

        let Commands::MultiBranch(args) = cli.command else {
            panic!("expected multi-branch");
        };
        assert_eq!(args.branch, "feature/x");
        assert_eq!(args.include.as_deref(), Some("*backend*"));
        assert!(args.flags.push);
        assert!(args.flags.draft_pr);
        assert!(!args.flags.no_verify);
    }

    #[test]
    fn test_parse_branch_requires_owner() {
        let result = Cli::try_parse_from(["codesplit", "branch", "-b", "x", "-m", "msg"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_recover_id_conflicts_with_list() {
        let result = Cli::try_parse_from(["codesplit", "recover", "--list", "--id", "abc"]);
        assert!(result.is_err());
    }
}
