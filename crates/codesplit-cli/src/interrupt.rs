//! Ctrl-C handling for branch-producing commands.
//!
//! An interrupt never cleans up on its own. It reports the operation records
//! still open for this repository and exits with status 130, leaving the
//! rollback to `codesplit recover`.

use std::io::{self, Write};
use std::thread;

use codesplit_core::{FileOperationStore, OperationStore};

use crate::output;

/// Exit status used when interrupted.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Watch for Ctrl-C on a background thread for the rest of the process.
pub fn install(store: FileOperationStore) {
    let spawned = thread::Builder::new()
        .name("codesplit-interrupt".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!(error = %e, "interrupt handler unavailable");
                    return;
                }
            };

            if let Err(e) = runtime.block_on(tokio::signal::ctrl_c()) {
                tracing::warn!(error = %e, "could not listen for Ctrl-C");
                return;
            }
            eprintln!();
            output::warn("Interrupted");
            if let Err(e) = report(&store, &mut io::stderr().lock()) {
                tracing::warn!(error = %e, "could not report incomplete operations");
            }
            std::process::exit(EXIT_INTERRUPTED);
        });

    if let Err(e) = spawned {
        tracing::warn!(error = %e, "could not start interrupt handler");
    }
}

/// Write the open records with the command that rolls each one back.
fn report<S: OperationStore>(store: &S, out: &mut impl Write) -> io::Result<()> {
    let records = match store.list_incomplete() {
        Ok(records) => records,
        Err(e) => return writeln!(out, "Could not read operation records: {e}"),
    };
    if records.is_empty() {
        return Ok(());
    }

    writeln!(out, "Incomplete operations were left behind:")?;
    for record in &records {
        writeln!(
            out,
            "  {} ({}, stage {}) - codesplit recover --id {}",
            record.id, record.kind, record.current_stage, record.id
        )?;
    }
    writeln!(out, "Run `codesplit recover --list` to inspect them.")
}
