//! Kubectl wrapper utilities
//!
//! All cluster access goes through the kubectl binary (K3s symlinks it
//! next to itself); no API client libraries are linked. The kubeconfig
//! is threaded explicitly because the server-side commands run as root
//! against /etc/rancher/k3s/k3s.yaml while user sessions rely on the
//! normal resolution order.

use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::Command;

/// Run a kubectl command with optional kubeconfig
pub fn run_kubectl(args: &[&str], kubeconfig: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new("kubectl");

    if let Some(kc) = kubeconfig {
        cmd.env("KUBECONFIG", kc);
    }

    cmd.args(args);

    let status = cmd.status().context("Failed to run kubectl command")?;

    if !status.success() {
        return Err(anyhow!("kubectl command failed: {}", args.join(" ")));
    }

    Ok(())
}

/// Run kubectl and capture output
pub fn run_kubectl_output(args: &[&str], kubeconfig: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new("kubectl");

    if let Some(kc) = kubeconfig {
        cmd.env("KUBECONFIG", kc);
    }

    cmd.args(args);

    let output = cmd.output().context("Failed to run kubectl command")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "kubectl command failed: {}\n{}",
            args.join(" "),
            stderr
        ));
    }

    Ok(String::from_utf8(output.stdout)?)
}

/// True when the API server answers its readiness probe
pub fn api_ready(kubeconfig: Option<&Path>) -> bool {
    run_kubectl_output(&["get", "--raw", "/readyz"], kubeconfig)
        .map(|out| out.trim() == "ok")
        .unwrap_or(false)
}

/// True when `kubectl cluster-info` succeeds against the target
pub fn cluster_reachable(kubeconfig: Option<&Path>) -> bool {
    run_kubectl_output(&["cluster-info"], kubeconfig).is_ok()
}

/// Check whether a namespace exists
pub fn namespace_exists(namespace: &str, kubeconfig: Option<&Path>) -> bool {
    run_kubectl_output(&["get", "namespace", namespace, "--no-headers"], kubeconfig).is_ok()
}

/// Create a namespace if it does not exist yet
pub fn ensure_namespace(namespace: &str, kubeconfig: Option<&Path>) -> Result<()> {
    if namespace_exists(namespace, kubeconfig) {
        crate::log_info!("Namespace '{}' already exists", namespace);
        return Ok(());
    }

    crate::log_info!("Creating namespace '{}'", namespace);
    run_kubectl(&["create", "namespace", namespace], kubeconfig)
}

/// Tail logs for a label selector, streaming to the terminal
pub fn tail_logs(
    namespace: &str,
    selector: &str,
    lines: u32,
    follow: bool,
    kubeconfig: Option<&Path>,
) -> Result<()> {
    let tail = format!("--tail={}", lines);
    let mut args = vec!["logs", "-n", namespace, "-l", selector, tail.as_str()];
    if follow {
        args.push("-f");
    }
    run_kubectl(&args, kubeconfig)
}

/// Port-forward a service until the user interrupts it. A non-zero
/// exit from Ctrl+C is normal here, so only spawn failures error.
pub fn port_forward(
    namespace: &str,
    target: &str,
    mapping: &str,
    kubeconfig: Option<&Path>,
) -> Result<()> {
    let mut cmd = Command::new("kubectl");

    if let Some(kc) = kubeconfig {
        cmd.env("KUBECONFIG", kc);
    }

    cmd.args(["port-forward", "-n", namespace, target, mapping]);
    cmd.status().context("Failed to run kubectl port-forward")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kubectl_module_exists() {
        // Basic compile test
        let _ = run_kubectl as fn(&[&str], Option<&Path>) -> Result<()>;
    }
}
