//! Dry-run mode utilities
//!
//! Dry-run is a process-wide switch set once from the CLI flag. The
//! DRUID_DEV_DRY_RUN environment variable is honored as well so wrapper
//! scripts can force it without touching arguments.

use colored::Colorize;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

static DRY_RUN: AtomicBool = AtomicBool::new(false);

/// Enable or disable dry-run mode for this process
pub fn set_dry_run(enabled: bool) {
    DRY_RUN.store(enabled, Ordering::Relaxed);
}

/// Check if dry-run mode is enabled
pub fn is_dry_run() -> bool {
    DRY_RUN.load(Ordering::Relaxed) || env::var("DRUID_DEV_DRY_RUN").is_ok()
}

/// Log a dry-run action
pub fn log_action(action: &str) {
    if is_dry_run() {
        println!("  {} {}", "[DRY RUN]".cyan().bold(), action);
    }
}

/// Log multiple dry-run actions as a numbered list
pub fn log_actions(actions: &[String]) {
    if !is_dry_run() {
        return;
    }

    println!(
        "{}",
        "[DRY RUN] Would perform the following actions:"
            .cyan()
            .bold()
    );
    println!();

    for (i, action) in actions.iter().enumerate() {
        println!("  {}. {}", i + 1, action);
    }

    println!();
    println!("{}", "No changes were made (--dry-run mode)".yellow());
}

/// Execute function only if not in dry-run mode
/// Returns Ok(()) in dry-run mode without executing
pub fn exec_unless_dry_run<F>(action_desc: &str, f: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    if is_dry_run() {
        log_action(action_desc);
        Ok(())
    } else {
        f()
    }
}

/// Execute function and return value only if not in dry-run mode
/// Returns the default value in dry-run mode
pub fn exec_unless_dry_run_with_default<F, T>(
    action_desc: &str,
    default: T,
    f: F,
) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    if is_dry_run() {
        log_action(action_desc);
        Ok(default)
    } else {
        f()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_respects_dry_run_switch() {
        // Single test so the global switch is exercised sequentially.
        set_dry_run(true);
        let mut executed = false;
        let result = exec_unless_dry_run("stop k3s service", || {
            executed = true;
            Ok(())
        });
        assert!(result.is_ok());
        assert!(!executed);

        let token = exec_unless_dry_run_with_default(
            "read node token",
            String::from("placeholder"),
            || Ok(String::from("real")),
        );
        assert_eq!(token.ok().as_deref(), Some("placeholder"));

        set_dry_run(false);
        let mut executed = false;
        let result = exec_unless_dry_run("stop k3s service", || {
            executed = true;
            Ok(())
        });
        assert!(result.is_ok());
        assert!(executed);
    }
}
