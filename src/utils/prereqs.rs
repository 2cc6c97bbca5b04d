//! Prerequisite checking system for required tools

use anyhow::Result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrereqError {
    #[error("Tool '{name}' not found")]
    NotFound { name: String, hint: String },

    #[error("Failed to check for tool '{name}': {source}")]
    CheckFailed { name: String, source: anyhow::Error },
}

/// Trait for checking prerequisites
pub trait Prerequisite {
    /// Name of the prerequisite tool
    fn name(&self) -> &str;

    /// Check if the tool is available
    fn check(&self) -> Result<(), PrereqError>;

    /// Installation hint for the user
    fn install_hint(&self) -> &str;
}

/// Basic prerequisite that checks if a command exists
pub struct CommandPrereq {
    pub name: String,
    pub hint: String,
}

impl CommandPrereq {
    pub fn new(name: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hint: hint.into(),
        }
    }
}

impl Prerequisite for CommandPrereq {
    fn name(&self) -> &str {
        &self.name
    }

    fn check(&self) -> Result<(), PrereqError> {
        which::which(&self.name).map_err(|_| PrereqError::NotFound {
            name: self.name.clone(),
            hint: self.hint.clone(),
        })?;
        Ok(())
    }

    fn install_hint(&self) -> &str {
        &self.hint
    }
}

/// Common prerequisites for druid-dev
pub struct CommonPrereqs;

impl CommonPrereqs {
    /// kubectl (installed by K3s itself on cluster nodes)
    pub fn kubectl() -> CommandPrereq {
        CommandPrereq::new(
            "kubectl",
            "Installed by 'druid-dev server install', or from https://kubernetes.io/docs/tasks/tools/",
        )
    }

    /// helm (installed by 'server install' when missing)
    pub fn helm() -> CommandPrereq {
        CommandPrereq::new(
            "helm",
            "Installed by 'druid-dev server install', or from https://helm.sh/docs/intro/install/",
        )
    }

    /// systemctl: K3s runs as a systemd unit
    pub fn systemctl() -> CommandPrereq {
        CommandPrereq::new("systemctl", "K3s requires a systemd host")
    }

    /// ping, used for the worker-side reachability probe
    pub fn ping() -> CommandPrereq {
        CommandPrereq::new("ping", "Install iputils (e.g. apt install iputils-ping)")
    }

    /// ip, used by cleanup to remove leftover CNI interfaces
    pub fn ip() -> CommandPrereq {
        CommandPrereq::new("ip", "Install iproute2 (e.g. apt install iproute2)")
    }

    /// iptables, used by cleanup to strip KUBE-/CNI- rules
    pub fn iptables() -> CommandPrereq {
        CommandPrereq::new("iptables", "Install iptables (e.g. apt install iptables)")
    }

    /// Check all prerequisites and return detailed results
    /// Returns (found_tools, missing_tools)
    pub fn check_all(prereqs: &[&dyn Prerequisite]) -> (Vec<String>, Vec<(String, String)>) {
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for prereq in prereqs {
            match prereq.check() {
                Ok(_) => {
                    found.push(prereq.name().to_string());
                }
                Err(e) => match e {
                    PrereqError::NotFound { name, hint } => {
                        missing.push((name, hint));
                    }
                    PrereqError::CheckFailed { name, source } => {
                        crate::log_warn!("Failed to check {}: {}", name, source);
                    }
                },
            }
        }

        (found, missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prereq_trait() {
        let prereq = CommandPrereq::new("echo", "Should always exist");
        assert_eq!(prereq.name(), "echo");
        assert!(prereq.check().is_ok());
    }

    #[test]
    fn test_missing_prereq() {
        let prereq = CommandPrereq::new("nonexistent-tool-xyz", "Test hint");
        assert!(prereq.check().is_err());
    }

    #[test]
    fn test_check_all_partitions() {
        let present = CommandPrereq::new("echo", "exists");
        let absent = CommandPrereq::new("druid-dev-no-such-tool", "missing hint");
        let (found, missing) =
            CommonPrereqs::check_all(&[&present as &dyn Prerequisite, &absent]);
        assert_eq!(found, vec!["echo".to_string()]);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].0, "druid-dev-no-such-tool");
    }
}
