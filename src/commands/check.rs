//! Prerequisite check: what this host has and what it is missing
//!
//! Purely local, no cluster access. Useful before running the install
//! on a fresh machine, or scoped with --deploy / --cleanup to the
//! tools one operation needs.

use crate::utils::prereqs::{CommandPrereq, CommonPrereqs, Prerequisite};
use crate::utils::privilege;
use anyhow::{Result, bail};
use colored::Colorize;

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    /// Only the tools `deploy` needs
    pub deploy: bool,
    /// Only the tools `cleanup` needs
    pub cleanup: bool,
}

/// Report tool availability, scoped by the options
pub fn check(opts: &CheckOptions) -> Result<()> {
    crate::log_banner!("Prerequisite Check");

    let prereqs = selected_prereqs(opts);
    let refs: Vec<&dyn Prerequisite> = prereqs.iter().map(|p| p as &dyn Prerequisite).collect();
    let (found, missing) = CommonPrereqs::check_all(&refs);

    println!();
    for name in &found {
        println!("  {} {}", "✓".green(), name);
    }
    for (name, hint) in &missing {
        println!("  {} {} ({})", "✗".red(), name, hint);
    }
    println!();

    match privilege::effective_uid() {
        Ok(0) => println!("  Running as root"),
        Ok(_) => println!("  Not running as root (server/worker/cleanup need sudo)"),
        Err(_) => {}
    }
    println!();

    if missing.is_empty() {
        println!("{}", "All prerequisites found".green());
        Ok(())
    } else {
        bail!("{} prerequisite(s) missing", missing.len());
    }
}

/// The tool list for the requested scope; everything when unscoped
fn selected_prereqs(opts: &CheckOptions) -> Vec<CommandPrereq> {
    let mut prereqs = Vec::new();

    let everything = !opts.deploy && !opts.cleanup;

    if everything {
        prereqs.push(CommonPrereqs::systemctl());
        prereqs.push(CommonPrereqs::ping());
    }
    if everything || opts.deploy {
        prereqs.push(CommonPrereqs::kubectl());
        prereqs.push(CommonPrereqs::helm());
    }
    if everything || opts.cleanup {
        prereqs.push(CommonPrereqs::ip());
        prereqs.push(CommonPrereqs::iptables());
    }

    prereqs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscoped_check_covers_every_tool() {
        let names: Vec<String> = selected_prereqs(&CheckOptions::default())
            .iter()
            .map(|p| p.name.clone())
            .collect();
        for tool in ["systemctl", "ping", "kubectl", "helm", "ip", "iptables"] {
            assert!(names.contains(&tool.to_string()), "missing {}", tool);
        }
    }

    #[test]
    fn test_deploy_scope_is_kubectl_and_helm() {
        let names: Vec<String> = selected_prereqs(&CheckOptions {
            deploy: true,
            cleanup: false,
        })
        .iter()
        .map(|p| p.name.clone())
        .collect();
        assert_eq!(names, vec!["kubectl", "helm"]);
    }

    #[test]
    fn test_cleanup_scope_is_network_tools() {
        let names: Vec<String> = selected_prereqs(&CheckOptions {
            deploy: false,
            cleanup: true,
        })
        .iter()
        .map(|p| p.name.clone())
        .collect();
        assert_eq!(names, vec!["ip", "iptables"]);
    }
}
