//! Root privilege checks for the mutating commands
//!
//! The K3s installer and the cleanup path write under /etc, /usr/local/bin
//! and /var/lib, so those commands refuse to start without effective UID 0.
//! The check happens before anything else runs.

use crate::utils::dryrun;
use crate::utils::errors::DruidDevError;
use anyhow::{Context, Result, anyhow};
use std::process::Command;

/// Effective UID of this process, via `id -u`
pub fn effective_uid() -> Result<u32> {
    let output = Command::new("id")
        .arg("-u")
        .output()
        .context("Failed to run 'id -u'")?;

    if !output.status.success() {
        return Err(anyhow!("'id -u' exited with {}", output.status));
    }

    parse_uid(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the output of `id -u`
pub fn parse_uid(raw: &str) -> Result<u32> {
    raw.trim()
        .parse::<u32>()
        .with_context(|| format!("Unexpected 'id -u' output: {:?}", raw))
}

/// Fail unless the given UID is root
pub fn ensure_root_uid(uid: u32, operation: &str) -> Result<()> {
    if uid != 0 {
        return Err(DruidDevError::not_root(operation).into());
    }
    Ok(())
}

/// Gate a privileged operation. In dry-run mode the check is logged
/// and skipped so plans can be previewed without sudo.
pub fn require_root(operation: &str) -> Result<()> {
    if dryrun::is_dry_run() {
        dryrun::log_action(&format!("Verify root privileges for '{}'", operation));
        return Ok(());
    }
    ensure_root_uid(effective_uid()?, operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uid() {
        assert_eq!(parse_uid("0\n").unwrap(), 0);
        assert_eq!(parse_uid(" 1000 ").unwrap(), 1000);
        assert!(parse_uid("root").is_err());
        assert!(parse_uid("").is_err());
    }

    #[test]
    fn test_ensure_root_uid() {
        assert!(ensure_root_uid(0, "server install").is_ok());
        let err = ensure_root_uid(1000, "server install").unwrap_err();
        assert!(err.to_string().contains("must run as root"));
    }
}
