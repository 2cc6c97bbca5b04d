//! Apache Druid deployment via the community Helm chart
//!
//! The built-in values size every Druid service for the two-node demo
//! profile (two 4 GB machines): single replicas, small JVM heaps, one
//! ZooKeeper, Derby metadata store and node-local deep storage. Larger
//! setups should pass --values with their own file.

use crate::config::settings::DruidSettings;
use crate::k8s::{helm, status};
use crate::utils::PollConfig;
use crate::utils::errors::DruidDevError;
use crate::utils::progress::WaitProgress;
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Readiness poll: 10s apart, 60 attempts (10 minutes). First-time
/// image pulls on small machines dominate this budget.
const READY_POLL_INTERVAL: Duration = Duration::from_secs(10);
const READY_POLL_ATTEMPTS: u32 = 60;

/// Built-in chart values for the two-node demo profile
pub fn default_values() -> Value {
    json!({
        "zookeeper": {
            "enabled": true,
            "replicaCount": 1,
        },
        // Derby runs inside the coordinator; no external metadata store
        "mysql": { "enabled": false },
        "postgresql": { "enabled": false },
        "broker": {
            "replicaCount": 1,
            "config": {
                "DRUID_XMS": "256m",
                "DRUID_XMX": "512m",
                "druid_processing_numThreads": "1",
                "druid_processing_numMergeBuffers": "2",
            },
        },
        "coordinator": {
            "replicaCount": 1,
            "config": {
                "DRUID_XMS": "256m",
                "DRUID_XMX": "256m",
            },
        },
        "historical": {
            "replicaCount": 1,
            "config": {
                "DRUID_XMS": "512m",
                "DRUID_XMX": "512m",
                "druid_processing_numThreads": "1",
            },
            "persistence": {
                "enabled": true,
                "size": "4Gi",
            },
        },
        "middleManager": {
            "replicaCount": 1,
            "config": {
                "DRUID_XMS": "64m",
                "DRUID_XMX": "128m",
                "druid_worker_capacity": "1",
                "druid_indexer_runner_javaOptsArray": "[\"-server\", \"-Xms256m\", \"-Xmx256m\"]",
            },
        },
        "router": {
            "enabled": true,
            "replicaCount": 1,
            "config": {
                "DRUID_XMS": "128m",
                "DRUID_XMX": "128m",
            },
        },
    })
}

/// Render chart values to YAML
pub fn render_values(values: &Value) -> Result<String> {
    serde_yaml::to_string(values).context("Failed to render chart values as YAML")
}

/// Stage chart values in a temp file for `helm -f`
pub fn write_values_file(values: &Value) -> Result<NamedTempFile> {
    use std::io::Write;

    let yaml = render_values(values)?;
    let mut file = tempfile::Builder::new()
        .prefix("druid-values-")
        .suffix(".yaml")
        .tempfile()
        .context("Failed to stage chart values")?;
    file.write_all(yaml.as_bytes())
        .context("Failed to write chart values")?;
    Ok(file)
}

/// Register the chart repo and run `helm upgrade --install`
pub fn install_chart(
    druid: &DruidSettings,
    values_file: &Path,
    set_overrides: &[String],
    kubeconfig: Option<&Path>,
) -> Result<()> {
    crate::log_info!(
        "Adding Helm repo '{}' ({})",
        druid.repo_name,
        druid.repo_url
    );
    helm::repo_add(&druid.repo_name, &druid.repo_url, kubeconfig)?;
    helm::repo_update(kubeconfig)?;

    crate::log_info!(
        "Installing release '{}' from chart '{}' into namespace '{}'",
        druid.release,
        druid.chart,
        druid.namespace
    );
    helm::upgrade_install(
        &druid.release,
        &druid.chart,
        &druid.namespace,
        druid.chart_version.as_deref(),
        Some(values_file),
        set_overrides,
        kubeconfig,
    )
}

/// Poll until every pod in the namespace is ready. Fails when the
/// attempt cap is exhausted, listing whatever is still pending.
pub fn wait_for_pods_ready(namespace: &str, kubeconfig: Option<&Path>) -> Result<()> {
    let progress = WaitProgress::new(&format!("Druid pods in '{}'", namespace));
    let poll = PollConfig::new(
        format!("Druid pods in namespace '{}'", namespace),
        READY_POLL_INTERVAL,
        READY_POLL_ATTEMPTS,
    );

    let result = poll.wait_until(|| match status::get_pods(namespace, kubeconfig) {
        Ok(pods) if !pods.is_empty() => {
            let (ready, total) = status::ready_counts(&pods);
            progress.tick_status(&format!("{}/{} ready", ready, total));
            ready == total
        }
        Ok(_) => {
            progress.tick_status("no pods yet");
            false
        }
        Err(_) => {
            progress.tick_status("API not answering");
            false
        }
    });

    match result {
        Ok(_) => {
            progress.finish_success();
            Ok(())
        }
        Err(_) => {
            progress.finish_error("not all pods became ready");
            if let Ok(pods) = status::get_pods(namespace, kubeconfig) {
                for pod in pods.iter().filter(|p| !p.is_ready()) {
                    crate::log_error!(
                        "  {} is {} ({}/{} containers ready)",
                        pod.name,
                        pod.phase,
                        pod.ready_containers,
                        pod.total_containers
                    );
                }
            }
            Err(DruidDevError::poll_timeout(&format!(
                "Druid pods in namespace '{}'",
                namespace
            ))
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_shape() {
        let values = default_values();
        assert_eq!(values["zookeeper"]["replicaCount"], 1);
        assert_eq!(values["mysql"]["enabled"], false);
        assert_eq!(values["broker"]["config"]["DRUID_XMX"], "512m");
        assert_eq!(values["historical"]["persistence"]["size"], "4Gi");
    }

    #[test]
    fn test_render_values_yaml() {
        let yaml = render_values(&default_values()).unwrap();
        assert!(yaml.contains("zookeeper:"));
        assert!(yaml.contains("DRUID_XMX: 512m"));
        assert!(yaml.contains("replicaCount: 1"));
        // Derby profile: both external stores off
        assert!(yaml.contains("mysql:"));
        assert!(yaml.contains("enabled: false"));
    }

    #[test]
    fn test_write_values_file() {
        let file = write_values_file(&default_values()).unwrap();
        let body = std::fs::read_to_string(file.path()).unwrap();
        assert!(body.contains("middleManager:"));
        assert!(file.path().to_string_lossy().ends_with(".yaml"));
    }
}
