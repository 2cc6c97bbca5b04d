//! Cluster verification: a fixed sequence of read-only health checks
//!
//! Every check classifies into pass/warn/fail from command output text.
//! Missing optional components (helm, metrics-server) and non-ready
//! pods are warnings; an unreachable API or a NotReady node is an
//! error. The command never mutates anything and never needs root.

use crate::k8s::helm::{self, HelmRelease};
use crate::k8s::kubectl;
use crate::k8s::status::{self, NodeStatus, PodStatus};
use anyhow::{Result, bail};
use colored::Colorize;
use std::path::Path;

/// The demo topology this tool provisions
const EXPECTED_NODES: usize = 2;

/// Result of a single health check
#[derive(Debug, Clone)]
pub enum CheckResult {
    Pass(String),
    Warn(String),
    Fail(String),
}

impl CheckResult {
    pub fn is_error(&self) -> bool {
        matches!(self, CheckResult::Fail(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, CheckResult::Warn(_))
    }

    pub fn display(&self) {
        match self {
            CheckResult::Pass(msg) => {
                println!("  {} {}", "✓".green(), msg);
            }
            CheckResult::Warn(msg) => {
                println!("  {} {}", "⚠".yellow(), msg);
            }
            CheckResult::Fail(msg) => {
                println!("  {} {}", "✗".red(), msg);
            }
        }
    }
}

/// Collected verification results
#[derive(Debug, Default)]
pub struct VerifyReport {
    checks: Vec<CheckResult>,
}

impl VerifyReport {
    pub fn push(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    pub fn extend(&mut self, checks: Vec<CheckResult>) {
        self.checks.extend(checks);
    }

    pub fn error_count(&self) -> usize {
        self.checks.iter().filter(|c| c.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.checks.iter().filter(|c| c.is_warning()).count()
    }

    /// Errors and warnings both count as issues in the summary
    pub fn issue_count(&self) -> usize {
        self.error_count() + self.warning_count()
    }

    /// Print every check and the summary line; true when error-free
    pub fn display(&self) -> bool {
        println!();
        for check in &self.checks {
            check.display();
        }
        println!();

        let errors = self.error_count();
        let warnings = self.warning_count();

        if self.issue_count() == 0 {
            println!("{}", "All checks passed, 0 issues found".green());
        } else {
            println!(
                "{} error(s), {} warning(s): {} issue(s) found",
                errors,
                warnings,
                self.issue_count()
            );
        }

        errors == 0
    }
}

/// Classify node health. All nodes Ready is a pass; any NotReady node
/// is an error; fewer nodes than the demo topology is a warning (the
/// worker has probably not joined yet).
pub fn evaluate_nodes(nodes: &[NodeStatus], expected: usize) -> Vec<CheckResult> {
    let mut checks = Vec::new();

    if nodes.is_empty() {
        checks.push(CheckResult::Fail("No nodes registered".to_string()));
        return checks;
    }

    let not_ready: Vec<&NodeStatus> = nodes.iter().filter(|n| !n.ready).collect();
    if not_ready.is_empty() {
        checks.push(CheckResult::Pass(format!(
            "All {} node(s) Ready",
            nodes.len()
        )));
    } else {
        for node in &not_ready {
            checks.push(CheckResult::Fail(format!("Node {} is NotReady", node.name)));
        }
    }

    if nodes.len() < expected {
        checks.push(CheckResult::Warn(format!(
            "{} node(s) registered, expected {} (worker not joined yet?)",
            nodes.len(),
            expected
        )));
    }

    checks
}

/// Classify pod health in the application namespace. Non-ready pods
/// are a warning: slow pulls and restarts are routine on small nodes.
pub fn evaluate_pods(pods: &[PodStatus], namespace: &str) -> Vec<CheckResult> {
    if pods.is_empty() {
        return vec![CheckResult::Warn(format!(
            "No pods in namespace '{}' (run 'druid-dev deploy')",
            namespace
        ))];
    }

    let (ready, total) = status::ready_counts(pods);
    if ready == total {
        vec![CheckResult::Pass(format!(
            "All {} pod(s) in '{}' ready",
            total, namespace
        ))]
    } else {
        let stuck: Vec<String> = pods
            .iter()
            .filter(|p| !p.is_ready())
            .map(|p| format!("{} ({})", p.name, p.phase))
            .collect();
        vec![CheckResult::Warn(format!(
            "{}/{} pod(s) in '{}' ready, pending: {}",
            ready,
            total,
            namespace,
            stuck.join(", ")
        ))]
    }
}

/// Classify the Helm release status
pub fn evaluate_release(releases: &[HelmRelease], release: &str) -> CheckResult {
    match releases.iter().find(|r| r.name == release) {
        Some(r) if r.is_deployed() => {
            CheckResult::Pass(format!("Helm release '{}' deployed ({})", release, r.chart))
        }
        Some(r) => CheckResult::Warn(format!(
            "Helm release '{}' in state '{}'",
            release, r.status
        )),
        None => CheckResult::Warn(format!(
            "Helm release '{}' not found (run 'druid-dev deploy')",
            release
        )),
    }
}

/// Classify PVC binding from `kubectl get pvc --no-headers` rows
pub fn evaluate_pvcs(output: &str, namespace: &str) -> Option<CheckResult> {
    let rows: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    if rows.is_empty() {
        return None;
    }

    let unbound: Vec<&str> = rows
        .iter()
        .filter(|l| l.split_whitespace().nth(1) != Some("Bound"))
        .filter_map(|l| l.split_whitespace().next())
        .collect();

    if unbound.is_empty() {
        Some(CheckResult::Pass(format!(
            "All {} PVC(s) in '{}' bound",
            rows.len(),
            namespace
        )))
    } else {
        Some(CheckResult::Warn(format!(
            "Unbound PVC(s) in '{}': {}",
            namespace,
            unbound.join(", ")
        )))
    }
}

/// Run the whole sequence and print the report. Errors make the
/// command fail; warnings alone do not.
pub fn verify(namespace: &str, release: &str, kubeconfig: Option<&Path>) -> Result<()> {
    crate::log_info!("Verifying cluster health...");

    let mut report = VerifyReport::default();

    // 1. API reachability gates everything else
    if !kubectl::cluster_reachable(kubeconfig) {
        report.push(CheckResult::Fail(
            "Cannot connect to the Kubernetes API server".to_string(),
        ));
        report.push(CheckResult::Warn(
            "Skipping cluster queries while the API is unreachable".to_string(),
        ));
        report.display();
        bail!(
            "verification failed: {} issue(s) found",
            report.issue_count()
        );
    }
    report.push(CheckResult::Pass("Cluster is reachable".to_string()));

    // 2. Node readiness
    match status::get_nodes(kubeconfig) {
        Ok(nodes) => report.extend(evaluate_nodes(&nodes, EXPECTED_NODES)),
        Err(_) => report.push(CheckResult::Fail("Could not list nodes".to_string())),
    }

    // 3. The k3s unit, when this host is a cluster node
    if crate::install::k3s::is_installed() {
        let server = crate::utils::service::is_active(crate::install::k3s::SERVER_SERVICE);
        let agent = crate::utils::service::is_active(crate::install::k3s::AGENT_SERVICE);
        if server || agent {
            report.push(CheckResult::Pass("K3s service active on this host".to_string()));
        } else {
            report.push(CheckResult::Fail(
                "K3s is installed on this host but no unit is active".to_string(),
            ));
        }
    }

    // 4. helm presence (optional component)
    let helm_present = crate::install::helm_cli::is_installed();
    if helm_present {
        report.push(CheckResult::Pass("helm is installed".to_string()));
    } else {
        report.push(CheckResult::Warn(
            "helm not found (deploy will install it, or see https://helm.sh)".to_string(),
        ));
    }

    // 5. metrics-server (optional component)
    let metrics = kubectl::run_kubectl_output(
        &[
            "get",
            "deployment",
            "metrics-server",
            "-n",
            "kube-system",
            "--no-headers",
        ],
        kubeconfig,
    );
    match metrics {
        Ok(_) => report.push(CheckResult::Pass("metrics-server present".to_string())),
        Err(_) => report.push(CheckResult::Warn(
            "metrics-server not found, 'kubectl top' will not work".to_string(),
        )),
    }

    // 6.-8. Application namespace, pods, release, PVCs
    if kubectl::namespace_exists(namespace, kubeconfig) {
        report.push(CheckResult::Pass(format!(
            "Namespace '{}' exists",
            namespace
        )));

        match status::get_pods(namespace, kubeconfig) {
            Ok(pods) => report.extend(evaluate_pods(&pods, namespace)),
            Err(_) => report.push(CheckResult::Warn(format!(
                "Could not list pods in '{}'",
                namespace
            ))),
        }

        if helm_present {
            match helm::list_releases(namespace, kubeconfig) {
                Ok(releases) => report.push(evaluate_release(&releases, release)),
                Err(_) => report.push(CheckResult::Warn(
                    "Could not query helm releases".to_string(),
                )),
            }
        }

        if let Ok(pvc_out) = kubectl::run_kubectl_output(
            &["get", "pvc", "-n", namespace, "--no-headers"],
            kubeconfig,
        ) && let Some(check) = evaluate_pvcs(&pvc_out, namespace)
        {
            report.push(check);
        }
    } else {
        report.push(CheckResult::Warn(format!(
            "Namespace '{}' does not exist (run 'druid-dev deploy')",
            namespace
        )));
    }

    let ok = report.display();
    if !ok {
        bail!(
            "verification failed: {} issue(s) found ({} error(s))",
            report.issue_count(),
            report.error_count()
        );
    }
    Ok(())
}
