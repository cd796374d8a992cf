//! Terminal output formatting utilities.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

/// Set quiet mode globally. Call once at startup.
pub fn set_quiet(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Print a success message (suppressed in quiet mode).
pub fn success(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "✓".green(), msg);
    }
}

/// Print an error message (always prints to stderr).
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print the detached HEAD error message with guidance (always to stderr).
pub fn error_detached_head() {
    error("Cannot split changes in detached HEAD state.");
    eprintln!();
    eprintln!("Branches are cut from, and return to, the current branch. To fix this:");
    eprintln!("  1. Create a branch for your changes: git checkout -b <branch-name>");
    eprintln!("  2. Or return to an existing branch: git checkout <branch-name>");
}

/// Print a warning message (always prints to stderr).
pub fn warn(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print an info message (suppressed in quiet mode).
pub fn info(msg: &str) {
    if !is_quiet() {
        println!("{} {}", "→".blue(), msg);
    }
}

/// Print a detail line without prefix (suppressed in quiet mode).
///
/// Use for indented detail lines that accompany info or warn messages.
pub fn detail(msg: &str) {
    if !is_quiet() {
        println!("{msg}");
    }
}

/// Print essential machine-readable output (always prints).
///
/// Use for results that should be available for piping, like PR URLs.
pub fn essential(msg: &str) {
    println!("{msg}");
}

/// Print a horizontal line (suppressed in quiet mode).
pub fn hr() {
    if !is_quiet() {
        println!("{}", "─".repeat(50).dimmed());
    }
}

/// Format an owner identifier.
#[must_use]
pub fn owner(name: &str) -> String {
    name.cyan().bold().to_string()
}

/// Format a PR reference.
#[must_use]
pub fn pr_ref(number: u64) -> String {
    format!("#{number}").green().to_string()
}

/// `1 file` / `3 files`.
#[must_use]
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{n} {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pr_ref_is_green() {
        colored::control::set_override(true);
        assert_eq!(pr_ref(42), "#42".green().to_string());
        colored::control::unset_override();
    }

    #[test]
    fn count_pluralizes() {
        assert_eq!(count(0, "file"), "0 files");
        assert_eq!(count(1, "file"), "1 file");
        assert_eq!(count(2, "owner"), "2 owners");
    }
}
