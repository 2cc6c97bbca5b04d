//! Node and pod status parsing
//!
//! The health checks work off the plain-text tables kubectl prints with
//! --no-headers. Parsing lives in pure functions so the evaluation
//! logic can be exercised against canned output.

use crate::k8s::kubectl::run_kubectl_output;
use anyhow::Result;
use std::path::Path;

/// One row of `kubectl get nodes --no-headers`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub name: String,
    pub ready: bool,
    pub roles: String,
}

/// One row of `kubectl get pods --no-headers`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodStatus {
    pub name: String,
    pub ready_containers: u32,
    pub total_containers: u32,
    pub phase: String,
}

impl PodStatus {
    /// A pod counts as ready when all containers are up, or when it ran
    /// to completion (Helm hooks leave Completed pods behind).
    pub fn is_ready(&self) -> bool {
        (self.total_containers > 0 && self.ready_containers == self.total_containers)
            || self.phase == "Completed"
    }
}

/// Parse `kubectl get nodes --no-headers` rows:
/// `worker-1   Ready   <none>   5m   v1.31.4+k3s1`
pub fn parse_node_lines(output: &str) -> Vec<NodeStatus> {
    output
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 3 {
                return None;
            }
            // The STATUS column is comma-separated, e.g.
            // "Ready,SchedulingDisabled"; NotReady must not match.
            let ready = cols[1].split(',').any(|s| s == "Ready");
            Some(NodeStatus {
                name: cols[0].to_string(),
                ready,
                roles: cols[2].to_string(),
            })
        })
        .collect()
}

/// Parse `kubectl get pods --no-headers` rows:
/// `druid-broker-0   1/1   Running   0   3m`
pub fn parse_pod_lines(output: &str) -> Vec<PodStatus> {
    output
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < 3 {
                return None;
            }
            let (ready, total) = parse_ready_column(cols[1])?;
            Some(PodStatus {
                name: cols[0].to_string(),
                ready_containers: ready,
                total_containers: total,
                phase: cols[2].to_string(),
            })
        })
        .collect()
}

/// Parse the "x/y" READY column
fn parse_ready_column(col: &str) -> Option<(u32, u32)> {
    let (ready, total) = col.split_once('/')?;
    Some((ready.parse().ok()?, total.parse().ok()?))
}

/// Count of (ready, total) pods in a listing
pub fn ready_counts(pods: &[PodStatus]) -> (usize, usize) {
    let ready = pods.iter().filter(|p| p.is_ready()).count();
    (ready, pods.len())
}

/// Nodes of the target cluster
pub fn get_nodes(kubeconfig: Option<&Path>) -> Result<Vec<NodeStatus>> {
    let out = run_kubectl_output(&["get", "nodes", "--no-headers"], kubeconfig)?;
    Ok(parse_node_lines(&out))
}

/// Pods of a namespace; an empty namespace yields an empty list
pub fn get_pods(namespace: &str, kubeconfig: Option<&Path>) -> Result<Vec<PodStatus>> {
    let out = run_kubectl_output(
        &["get", "pods", "-n", namespace, "--no-headers"],
        kubeconfig,
    )?;
    Ok(parse_pod_lines(&out))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_READY_NODES: &str = "\
druid-server   Ready    control-plane,master   10m   v1.31.4+k3s1
druid-worker   Ready    <none>                 8m    v1.31.4+k3s1
";

    const ONE_NOT_READY: &str = "\
druid-server   Ready      control-plane,master   10m   v1.31.4+k3s1
druid-worker   NotReady   <none>                 8m    v1.31.4+k3s1
";

    #[test]
    fn test_parse_all_nodes_ready() {
        let nodes = parse_node_lines(TWO_READY_NODES);
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n.ready));
        assert_eq!(nodes[0].name, "druid-server");
        assert_eq!(nodes[0].roles, "control-plane,master");
    }

    #[test]
    fn test_parse_not_ready_node() {
        let nodes = parse_node_lines(ONE_NOT_READY);
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].ready);
        // "NotReady" contains the substring "Ready"; the parser must
        // still classify it as not ready.
        assert!(!nodes[1].ready);
    }

    #[test]
    fn test_parse_cordoned_node_still_ready() {
        let nodes =
            parse_node_lines("druid-worker   Ready,SchedulingDisabled   <none>   8m   v1.31.4+k3s1\n");
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].ready);
    }

    #[test]
    fn test_parse_node_empty_output() {
        assert!(parse_node_lines("").is_empty());
        assert!(parse_node_lines("\n\n").is_empty());
    }

    #[test]
    fn test_parse_pod_lines() {
        let out = "\
druid-broker-7bd95d5b-x2p4v    1/1   Running            0     4m
druid-historical-0             0/1   CrashLoopBackOff   3     4m
druid-init-job-abc             0/1   Completed          0     5m
";
        let pods = parse_pod_lines(out);
        assert_eq!(pods.len(), 3);
        assert!(pods[0].is_ready());
        assert!(!pods[1].is_ready());
        assert!(pods[2].is_ready()); // Completed counts as done

        let (ready, total) = ready_counts(&pods);
        assert_eq!((ready, total), (2, 3));
    }

    #[test]
    fn test_parse_multi_container_pod() {
        let pods = parse_pod_lines("druid-middle-manager-0   2/3   Running   1   9m\n");
        assert_eq!(pods[0].ready_containers, 2);
        assert_eq!(pods[0].total_containers, 3);
        assert!(!pods[0].is_ready());
    }
}
