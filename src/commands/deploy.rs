//! Druid deployment via the community Helm chart
//!
//! Installs the druid-helm chart with values trimmed for the two-node
//! demo footprint (Derby metadata store, single ZooKeeper, tight memory
//! requests). Pass --values to replace the bundled values entirely, or
//! --set for point overrides on top of them.

use crate::config::settings::{DruidSettings, Settings};
use crate::install::druid;
use crate::k8s::kubectl;
use crate::utils::dryrun::{self, exec_unless_dry_run};
use crate::utils::errors::DruidDevError;
use crate::utils::prereqs::{CommonPrereqs, Prerequisite};
use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Replacement values file; the bundled small-footprint values are
    /// used when unset
    pub values_file: Option<PathBuf>,
    /// `--set key=value` overrides passed straight to helm
    pub set_overrides: Vec<String>,
    /// Chart version pin overriding the config file
    pub chart_version: Option<String>,
    /// Return as soon as helm does instead of polling pod readiness
    pub skip_wait: bool,
}

/// Install or upgrade the Druid release
pub fn deploy(opts: &DeployOptions, settings: &Settings, kubeconfig: Option<&Path>) -> Result<()> {
    crate::log_banner!("Deploying Apache Druid");

    check_required_tools()?;

    if let Some(kc) = kubeconfig
        && !kc.exists()
    {
        return Err(DruidDevError::kubeconfig_not_found(&kc.display().to_string()).into());
    }

    if !dryrun::is_dry_run() && !kubectl::cluster_reachable(kubeconfig) {
        return Err(DruidDevError::cluster_unreachable().into());
    }

    let druid_settings = effective_druid_settings(opts, settings);

    // The staging binding keeps the temp file alive through the helm run
    let staged_values;
    let values_path: &Path = match &opts.values_file {
        Some(path) => {
            if !path.exists() {
                return Err(anyhow!("Values file {} does not exist", path.display()));
            }
            crate::log_info!("Using values from {}", path.display());
            path
        }
        None => {
            crate::log_info!("Using the bundled small-footprint values");
            staged_values = druid::write_values_file(&druid::default_values())
                .context("Failed to stage the default chart values")?;
            staged_values.path()
        }
    };

    exec_unless_dry_run(
        &format!(
            "helm upgrade --install {} {} -n {}",
            druid_settings.release, druid_settings.chart, druid_settings.namespace
        ),
        || druid::install_chart(&druid_settings, values_path, &opts.set_overrides, kubeconfig),
    )?;

    if opts.skip_wait {
        crate::log_info!("Skipping the readiness wait (--skip-wait)");
    } else if dryrun::is_dry_run() {
        dryrun::log_action(&format!(
            "wait for pods in '{}' to become ready",
            druid_settings.namespace
        ));
    } else {
        druid::wait_for_pods_ready(&druid_settings.namespace, kubeconfig)?;
    }

    print_deploy_summary(&druid_settings.namespace);
    Ok(())
}

/// kubectl and helm are both hard requirements here; `server install`
/// provides them on cluster nodes.
fn check_required_tools() -> Result<()> {
    let kubectl = CommonPrereqs::kubectl();
    let helm = CommonPrereqs::helm();
    let (_, missing) = CommonPrereqs::check_all(&[&kubectl as &dyn Prerequisite, &helm]);

    if let Some((name, hint)) = missing.into_iter().next() {
        return Err(DruidDevError::tool_not_found(&name, &hint).into());
    }
    Ok(())
}

/// Chart coordinates from the config file, with CLI pins on top
fn effective_druid_settings(opts: &DeployOptions, settings: &Settings) -> DruidSettings {
    let mut druid_settings = settings.druid.clone();
    if opts.chart_version.is_some() {
        druid_settings.chart_version = opts.chart_version.clone();
    }
    druid_settings
}

fn print_deploy_summary(namespace: &str) {
    crate::log_banner!("Druid deployed");
    println!();
    println!("Open the Druid console from your workstation:");
    println!(
        "  {}",
        format!(
            "kubectl -n {} port-forward svc/druid-router 9088:8888",
            namespace
        )
        .bold()
    );
    println!("  then browse to http://localhost:9088");
    println!();
    println!("Serve the bundled sample data for ingestion:");
    println!("  {}", "druid-dev serve".bold());
    println!("  use http://<this-host-ip>:8888/two-partition-demo.json as the input source");
    println!();
    println!("Check on the rollout at any time:");
    println!("  druid-dev verify");
    println!("  kubectl -n {} get pods", namespace);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_version_flag_overrides_config() {
        let mut settings = Settings::default();
        settings.druid.chart_version = Some("0.3.0".into());

        let opts = DeployOptions {
            chart_version: Some("0.3.5".into()),
            ..Default::default()
        };
        let effective = effective_druid_settings(&opts, &settings);
        assert_eq!(effective.chart_version.as_deref(), Some("0.3.5"));

        let no_pin = DeployOptions::default();
        let effective = effective_druid_settings(&no_pin, &settings);
        assert_eq!(effective.chart_version.as_deref(), Some("0.3.0"));
    }

    #[test]
    fn test_release_coordinates_come_from_config() {
        let settings = Settings::default();
        let effective = effective_druid_settings(&DeployOptions::default(), &settings);
        assert_eq!(effective.release, "druid");
        assert_eq!(effective.chart, "druid-helm/druid");
        assert_eq!(effective.namespace, "druid");
    }
}
