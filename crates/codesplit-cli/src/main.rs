//! codesplit CLI - split monorepo changes into CODEOWNERS-scoped branches.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod interrupt;
mod output;
mod services;

use commands::{Cli, Commands};

fn init_logging(verbose: bool) {
    let fallback = if verbose {
        "codesplit=debug"
    } else {
        "codesplit=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    output::set_quiet(cli.quiet);

    let result = match &cli.command {
        Commands::Branch(args) => commands::branch::run(args),
        Commands::MultiBranch(args) => commands::multi_branch::run(args),
        Commands::Recover(args) => commands::recover::run(args),
        Commands::List(args) => commands::list::run(args),
        Commands::Completions { shell } => commands::completions::run(*shell),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("{e:#}");
            if !message.is_empty() {
                output::error(&message);
            }
            ExitCode::FAILURE
        }
    }
}
