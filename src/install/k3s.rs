//! K3s installation via the upstream installer script
//!
//! Both node roles run the same script from https://get.k3s.io; the
//! argument list decides whether it becomes a server or an agent. The
//! script is downloaded once per run, staged in a temp file and invoked
//! through sh so a noexec /tmp cannot break it.

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::NamedTempFile;

pub const INSTALL_SCRIPT_URL: &str = "https://get.k3s.io";

/// systemd unit names the installer registers
pub const SERVER_SERVICE: &str = "k3s";
pub const AGENT_SERVICE: &str = "k3s-agent";

/// The API port K3s listens on; fixed upstream
pub const API_PORT: u16 = 6443;

/// Written by the server on first start; authenticates agent joins
pub const NODE_TOKEN_PATH: &str = "/var/lib/rancher/k3s/server/node-token";

/// Kubeconfig the server writes for local kubectl use
pub const KUBECONFIG_PATH: &str = "/etc/rancher/k3s/k3s.yaml";

/// Teardown scripts the installer drops next to the k3s binary.
/// killall stops every cluster process; the uninstall scripts remove
/// the installation for the role this host had.
pub const KILLALL_SCRIPT: &str = "/usr/local/bin/k3s-killall.sh";
pub const SERVER_UNINSTALL_SCRIPT: &str = "/usr/local/bin/k3s-uninstall.sh";
pub const AGENT_UNINSTALL_SCRIPT: &str = "/usr/local/bin/k3s-agent-uninstall.sh";

/// Installer invocation shared by both roles
#[derive(Debug, Clone)]
pub struct InstallEnv {
    /// INSTALL_K3S_CHANNEL (default "stable")
    pub channel: String,
    /// INSTALL_K3S_VERSION; None means the channel's latest
    pub version: Option<String>,
}

/// Arguments for `server` mode. The flag set is fixed for the two-node
/// demo profile: world-readable kubeconfig for local kubectl, traefik
/// off to save memory, a TLS SAN for the advertised address, and
/// kubelet eviction headroom suited to 4 GB machines.
#[derive(Debug, Clone)]
pub struct ServerArgs {
    pub advertise_ip: IpAddr,
    pub node_name: Option<String>,
    pub extra_args: Vec<String>,
}

impl ServerArgs {
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "server".into(),
            "--write-kubeconfig-mode".into(),
            "644".into(),
            "--disable".into(),
            "traefik".into(),
            "--tls-san".into(),
            self.advertise_ip.to_string(),
            "--kubelet-arg".into(),
            "eviction-hard=memory.available<200Mi".into(),
            "--kubelet-arg".into(),
            "image-gc-high-threshold=85".into(),
        ];
        if let Some(name) = &self.node_name {
            args.push("--node-name".into());
            args.push(name.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Arguments for `agent` mode
#[derive(Debug, Clone)]
pub struct AgentArgs {
    pub server_ip: IpAddr,
    pub token: String,
    pub node_name: Option<String>,
    pub extra_args: Vec<String>,
}

impl AgentArgs {
    pub fn server_url(&self) -> String {
        format!("https://{}:{}", self.server_ip, API_PORT)
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "agent".into(),
            "--server".into(),
            self.server_url(),
            "--token".into(),
            self.token.clone(),
        ];
        if let Some(name) = &self.node_name {
            args.push("--node-name".into());
            args.push(name.clone());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Download the installer script into a temp file
pub fn fetch_install_script() -> Result<NamedTempFile> {
    use std::io::Write;

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    let body = client
        .get(INSTALL_SCRIPT_URL)
        .send()
        .context("Failed to download the K3s install script")?
        .error_for_status()
        .context("K3s install script download returned an error status")?
        .text()
        .context("Failed to read the K3s install script body")?;

    let mut file = tempfile::Builder::new()
        .prefix("k3s-install-")
        .suffix(".sh")
        .tempfile()
        .context("Failed to stage the install script")?;

    file.write_all(body.as_bytes())
        .context("Failed to write the install script")?;

    Ok(file)
}

/// Run the staged installer with the given mode arguments
pub fn run_installer(script: &Path, args: &[String], env: &InstallEnv) -> Result<()> {
    let mut cmd = Command::new("sh");
    cmd.arg(script);
    cmd.args(args);
    cmd.env("INSTALL_K3S_CHANNEL", &env.channel);
    if let Some(version) = &env.version {
        cmd.env("INSTALL_K3S_VERSION", version);
    }

    let status = cmd.status().context("Failed to run the K3s installer")?;
    if !status.success() {
        return Err(anyhow!("K3s installer exited with {}", status));
    }
    Ok(())
}

/// Read the node token the server generated
pub fn read_node_token() -> Result<String> {
    let token = fs::read_to_string(NODE_TOKEN_PATH)
        .with_context(|| format!("Failed to read node token from {}", NODE_TOKEN_PATH))?;
    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(anyhow!("Node token file {} is empty", NODE_TOKEN_PATH));
    }
    Ok(token)
}

/// Run one of the uninstall scripts K3s ships
pub fn run_uninstall_script(path: &str) -> Result<()> {
    let status = Command::new("sh")
        .arg(path)
        .status()
        .with_context(|| format!("Failed to run {}", path))?;
    if !status.success() {
        return Err(anyhow!("{} exited with {}", path, status));
    }
    Ok(())
}

/// Whether the k3s binary is already present on this machine
pub fn is_installed() -> bool {
    which::which("k3s").is_ok()
}

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^K10[0-9a-f]{64}::").expect("valid token pattern")
    })
}

/// Full node tokens look like `K10<sha256>::server:<secret>`. Short
/// secrets also work for joins, so a mismatch is only worth a warning.
pub fn looks_like_node_token(token: &str) -> bool {
    token_pattern().is_match(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_args_fixed_flags() {
        let server = ServerArgs {
            advertise_ip: "192.168.1.50".parse().unwrap(),
            node_name: Some("druid-server".into()),
            extra_args: vec![],
        };
        let args = server.to_args();
        assert_eq!(args[0], "server");
        let joined = args.join(" ");
        assert!(joined.contains("--write-kubeconfig-mode 644"));
        assert!(joined.contains("--disable traefik"));
        assert!(joined.contains("--tls-san 192.168.1.50"));
        assert!(joined.contains("eviction-hard=memory.available<200Mi"));
        assert!(joined.contains("--node-name druid-server"));
    }

    #[test]
    fn test_server_args_without_node_name() {
        let server = ServerArgs {
            advertise_ip: "10.0.0.2".parse().unwrap(),
            node_name: None,
            extra_args: vec!["--disable".into(), "servicelb".into()],
        };
        let joined = server.to_args().join(" ");
        assert!(!joined.contains("--node-name"));
        assert!(joined.ends_with("--disable servicelb"));
    }

    #[test]
    fn test_agent_args() {
        let agent = AgentArgs {
            server_ip: "192.168.1.50".parse().unwrap(),
            token: "K10abc::server:xyz".into(),
            node_name: None,
            extra_args: vec![],
        };
        let args = agent.to_args();
        assert_eq!(
            args,
            vec![
                "agent",
                "--server",
                "https://192.168.1.50:6443",
                "--token",
                "K10abc::server:xyz",
            ]
        );
    }

    #[test]
    fn test_token_format() {
        let full = format!("K10{}::server:abcdef", "0123456789abcdef".repeat(4));
        assert!(looks_like_node_token(&full));
        assert!(!looks_like_node_token("some-short-secret"));
        assert!(!looks_like_node_token("K10tooshort::server:x"));
    }
}
