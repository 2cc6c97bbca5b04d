//! Helm wrapper utilities
//!
//! Mirrors the kubectl plumbing: every operation shells out to the helm
//! binary with KUBECONFIG threaded per child process.

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

/// One row of `helm list -o json`
#[derive(Debug, Deserialize)]
pub struct HelmRelease {
    pub name: String,
    pub namespace: String,
    pub status: String,
    pub chart: String,
    #[serde(default)]
    pub app_version: String,
}

impl HelmRelease {
    pub fn is_deployed(&self) -> bool {
        self.status == "deployed"
    }
}

/// Run a helm command with optional kubeconfig
pub fn run_helm(args: &[&str], kubeconfig: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new("helm");

    if let Some(kc) = kubeconfig {
        cmd.env("KUBECONFIG", kc);
    }

    cmd.args(args);

    let status = cmd.status().context("Failed to run helm command")?;

    if !status.success() {
        return Err(anyhow!("helm command failed: {}", args.join(" ")));
    }

    Ok(())
}

/// Run helm and capture output
pub fn run_helm_output(args: &[&str], kubeconfig: Option<&Path>) -> Result<String> {
    let mut cmd = Command::new("helm");

    if let Some(kc) = kubeconfig {
        cmd.env("KUBECONFIG", kc);
    }

    cmd.args(args);

    let output = cmd.output().context("Failed to run helm command")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "helm command failed: {}\n{}",
            args.join(" "),
            stderr
        ));
    }

    Ok(String::from_utf8(output.stdout)?)
}

/// Register or refresh a chart repository
pub fn repo_add(name: &str, url: &str, kubeconfig: Option<&Path>) -> Result<()> {
    run_helm(&["repo", "add", name, url, "--force-update"], kubeconfig)
}

/// Update the local repo cache
pub fn repo_update(kubeconfig: Option<&Path>) -> Result<()> {
    run_helm(&["repo", "update"], kubeconfig)
}

/// `helm upgrade --install` with optional version pin, values file and
/// --set overrides
pub fn upgrade_install(
    release: &str,
    chart: &str,
    namespace: &str,
    version: Option<&str>,
    values_file: Option<&Path>,
    set_overrides: &[String],
    kubeconfig: Option<&Path>,
) -> Result<()> {
    let mut args: Vec<String> = vec![
        "upgrade".into(),
        "--install".into(),
        release.into(),
        chart.into(),
        "--namespace".into(),
        namespace.into(),
        "--create-namespace".into(),
    ];

    if let Some(v) = version {
        args.push("--version".into());
        args.push(v.into());
    }

    if let Some(vf) = values_file {
        args.push("--values".into());
        args.push(vf.display().to_string());
    }

    for kv in set_overrides {
        args.push("--set".into());
        args.push(kv.clone());
    }

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    run_helm(&arg_refs, kubeconfig)
}

/// Uninstall a release; missing releases are reported as errors by helm
pub fn uninstall(release: &str, namespace: &str, kubeconfig: Option<&Path>) -> Result<()> {
    run_helm(&["uninstall", release, "--namespace", namespace], kubeconfig)
}

/// Releases in a namespace, parsed from `helm list -o json`
pub fn list_releases(namespace: &str, kubeconfig: Option<&Path>) -> Result<Vec<HelmRelease>> {
    let out = run_helm_output(
        &["list", "--namespace", namespace, "-o", "json"],
        kubeconfig,
    )?;
    parse_release_list(&out)
}

/// Parse the JSON body of `helm list -o json`
pub fn parse_release_list(json: &str) -> Result<Vec<HelmRelease>> {
    serde_json::from_str(json.trim()).context("Failed to parse helm release list")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release_list() {
        let json = r#"[{"name":"druid","namespace":"druid","revision":"2",
            "updated":"2025-05-02 10:11:12.000000 +0000 UTC","status":"deployed",
            "chart":"druid-0.3.5","app_version":"25.0.0"}]"#;
        let releases = parse_release_list(json).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].name, "druid");
        assert!(releases[0].is_deployed());
        assert_eq!(releases[0].chart, "druid-0.3.5");
    }

    #[test]
    fn test_parse_release_list_empty() {
        let releases = parse_release_list("[]\n").unwrap();
        assert!(releases.is_empty());
    }

    #[test]
    fn test_parse_release_list_failed_status() {
        let json = r#"[{"name":"druid","namespace":"druid","revision":"1",
            "updated":"","status":"pending-install","chart":"druid-0.3.5"}]"#;
        let releases = parse_release_list(json).unwrap();
        assert!(!releases[0].is_deployed());
        assert_eq!(releases[0].app_version, "");
    }
}
