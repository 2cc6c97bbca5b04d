//! Full teardown of the demo cluster on this host
//!
//! Every step is best-effort: cleanup is most useful on half-broken
//! installs, so a failing step logs and moves on instead of aborting.
//! The K3s uninstall scripts do the heavy lifting when they exist; the
//! rest catches what they leave behind after interrupted installs.

use crate::config::settings::Settings;
use crate::install::k3s;
use crate::k8s::helm;
use crate::utils::dryrun::{self, log_actions};
use crate::utils::{privilege, prompt, service};
use anyhow::Result;
use std::fs;
use std::path::Path;
use std::process::Command;

/// State directories K3s and its CNI leave behind
const RESIDUAL_DIRS: &[&str] = &[
    "/etc/rancher/k3s",
    "/var/lib/rancher/k3s",
    "/var/lib/kubelet",
    "/var/lib/cni",
];

/// Virtual interfaces flannel and kube-proxy create
const CNI_INTERFACES: &[&str] = &["cni0", "flannel.1", "flannel-v6.1", "flannel-wg", "kube-ipvs0"];

/// Strips KUBE-/CNI-/flannel rules while keeping everything else
const IPTABLES_FLUSH: &str =
    "iptables-save | grep -v KUBE- | grep -v CNI- | grep -iv flannel | iptables-restore";

#[derive(Debug, Clone, Default)]
pub struct CleanupOptions {
    /// Skip the confirmation prompt
    pub yes: bool,
}

/// Remove K3s, Druid and all cluster state from this host
pub fn cleanup(opts: &CleanupOptions, settings: &Settings) -> Result<()> {
    crate::log_banner!("Cluster Teardown");

    if needs_confirmation(opts, settings, dryrun::is_dry_run())
        && !prompt::confirm("This removes K3s, Druid and all cluster data from this host. Continue?")?
    {
        crate::log_info!("Aborted, nothing was removed");
        return Ok(());
    }

    privilege::require_root("remove the cluster from this host")?;

    if dryrun::is_dry_run() {
        log_actions(&cleanup_plan(settings));
        return Ok(());
    }

    remove_helm_release(settings);
    stop_services();
    run_uninstall_scripts();
    remove_residual_dirs();
    remove_network_interfaces();
    flush_kube_iptables();

    crate::log_banner!("Cleanup complete");
    crate::log_info!("A reboot clears any remaining kernel state (connections, mounts)");
    Ok(())
}

/// The prompt is skipped with --yes, via config, or in dry-run mode
fn needs_confirmation(opts: &CleanupOptions, settings: &Settings, dry_run: bool) -> bool {
    !opts.yes && settings.behavior.confirm_destructive && !dry_run
}

/// The numbered plan shown by --dry-run
fn cleanup_plan(settings: &Settings) -> Vec<String> {
    let mut plan = vec![
        format!(
            "helm uninstall {} -n {}",
            settings.druid.release, settings.druid.namespace
        ),
        format!(
            "stop the {} and {} services",
            k3s::SERVER_SERVICE,
            k3s::AGENT_SERVICE
        ),
        format!(
            "run {} / {} / {} when present",
            k3s::KILLALL_SCRIPT,
            k3s::SERVER_UNINSTALL_SCRIPT,
            k3s::AGENT_UNINSTALL_SCRIPT
        ),
    ];
    for dir in RESIDUAL_DIRS {
        plan.push(format!("remove {}", dir));
    }
    plan.push(format!("delete interfaces: {}", CNI_INTERFACES.join(", ")));
    plan.push(format!("flush cluster iptables rules ({})", IPTABLES_FLUSH));
    plan
}

/// Uninstall the Druid release first so pods stop writing to their PVCs
fn remove_helm_release(settings: &Settings) {
    if !crate::install::helm_cli::is_installed() {
        return;
    }
    crate::log_info!(
        "Uninstalling helm release '{}' from namespace '{}'...",
        settings.druid.release,
        settings.druid.namespace
    );
    helm::uninstall(&settings.druid.release, &settings.druid.namespace, None).ok();
}

fn stop_services() {
    for unit in [k3s::SERVER_SERVICE, k3s::AGENT_SERVICE] {
        if service::is_active(unit) {
            crate::log_info!("Stopping {}...", unit);
            service::stop(unit).ok();
        }
    }
}

/// The teardown scripts K3s installs alongside itself. killall first
/// so nothing is still writing while the uninstallers remove state.
fn run_uninstall_scripts() {
    for script in [
        k3s::KILLALL_SCRIPT,
        k3s::SERVER_UNINSTALL_SCRIPT,
        k3s::AGENT_UNINSTALL_SCRIPT,
    ] {
        if Path::new(script).exists() {
            crate::log_info!("Running {}...", script);
            k3s::run_uninstall_script(script).ok();
        }
    }
}

fn remove_residual_dirs() {
    for dir in RESIDUAL_DIRS {
        let path = Path::new(dir);
        if path.exists() {
            crate::log_info!("Removing {}...", dir);
            fs::remove_dir_all(path).ok();
        }
    }
}

fn remove_network_interfaces() {
    for iface in CNI_INTERFACES {
        let removed = Command::new("ip")
            .args(["link", "delete", iface])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if removed {
            crate::log_info!("Removed interface {}", iface);
        }
    }
}

fn flush_kube_iptables() {
    crate::log_info!("Flushing cluster iptables rules...");
    Command::new("sh")
        .args(["-c", IPTABLES_FLUSH])
        .status()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_covers_every_step() {
        let settings = Settings::default();
        let plan = cleanup_plan(&settings);
        let joined = plan.join("\n");
        assert!(joined.contains("helm uninstall druid -n druid"));
        assert!(joined.contains("k3s-killall.sh"));
        assert!(joined.contains("k3s-uninstall.sh"));
        for dir in RESIDUAL_DIRS {
            assert!(joined.contains(dir), "plan is missing {}", dir);
        }
        assert!(joined.contains("flannel.1"));
        assert!(joined.contains("iptables-restore"));
    }

    #[test]
    fn test_confirmation_gate() {
        let mut settings = Settings::default();
        let ask = CleanupOptions::default();
        let skip = CleanupOptions { yes: true };

        assert!(needs_confirmation(&ask, &settings, false));
        assert!(!needs_confirmation(&skip, &settings, false));
        assert!(!needs_confirmation(&ask, &settings, true));

        settings.behavior.confirm_destructive = false;
        assert!(!needs_confirmation(&ask, &settings, false));
    }
}
