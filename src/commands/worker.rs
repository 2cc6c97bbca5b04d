//! Worker node enrollment
//!
//! `worker join <SERVER_IP> <TOKEN>` runs on the second machine. Both
//! arguments come from the server's cluster-info.txt. Reachability is
//! probed before anything is installed: ICMP failure is only a warning
//! (plenty of networks drop ping) but a closed API port is fatal since
//! the agent could never register.

use crate::config::settings::Settings;
use crate::install::k3s;
use crate::utils::dryrun::{self, exec_unless_dry_run};
use crate::utils::errors::DruidDevError;
use crate::utils::progress::with_spinner;
use crate::utils::{net, privilege, service};
use anyhow::{Context, Result};
use colored::Colorize;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Attempts for the `systemctl is-active k3s-agent` poll, 5s apart
const AGENT_POLL_ATTEMPTS: u32 = 30;

/// Connect timeout for the API port probe
const PORT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    pub node_name: Option<String>,
}

/// Join this host to an existing K3s server as an agent
pub fn join(
    server_ip: IpAddr,
    token: &str,
    opts: &JoinOptions,
    settings: &Settings,
) -> Result<()> {
    crate::log_banner!("K3s Worker Join");

    privilege::require_root("join this host to the cluster")?;
    validate_token(token)?;

    if dryrun::is_dry_run() {
        dryrun::log_action(&format!("probe {} with ping and TCP {}", server_ip, k3s::API_PORT));
    } else {
        probe_server(server_ip)?;
    }

    let agent_args = build_agent_args(server_ip, token, opts, settings)?;
    let env = k3s::InstallEnv {
        channel: settings.k3s.channel.clone(),
        version: std::env::var("INSTALL_K3S_VERSION")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| settings.k3s.version.clone()),
    };

    exec_unless_dry_run("download and run the K3s installer (agent mode)", || {
        let script = with_spinner("Downloading the K3s installer...", k3s::fetch_install_script)?;
        crate::log_info!("Running the installer...");
        k3s::run_installer(script.path(), &agent_args.to_args(), &env)
    })?;

    if dryrun::is_dry_run() {
        dryrun::log_action(&format!("wait for the {} unit", k3s::AGENT_SERVICE));
    } else {
        service::wait_active(k3s::AGENT_SERVICE, AGENT_POLL_ATTEMPTS)?;
    }

    print_join_summary(server_ip);
    Ok(())
}

/// Reject empty tokens outright; merely warn about unfamiliar shapes
/// since short join secrets also work.
fn validate_token(token: &str) -> Result<()> {
    if token.trim().is_empty() {
        return Err(DruidDevError::invalid_token().into());
    }
    if !k3s::looks_like_node_token(token) {
        crate::log_warn!(
            "Token does not look like a full node token (K10<hash>::...), trying it anyway"
        );
    }
    Ok(())
}

/// ICMP first for a friendly diagnostic, then the port that matters
fn probe_server(server_ip: IpAddr) -> Result<()> {
    crate::log_info!("Probing server {}...", server_ip);

    if net::ping(server_ip) {
        crate::log_info!("Server answers ping");
    } else {
        crate::log_warn!("Server did not answer ping (possibly firewalled), continuing");
    }

    let api_addr = SocketAddr::new(server_ip, k3s::API_PORT);
    if !net::tcp_reachable(api_addr, PORT_PROBE_TIMEOUT) {
        return Err(DruidDevError::server_unreachable(&api_addr.to_string()).into());
    }
    crate::log_info!("API port {} is open", k3s::API_PORT);
    Ok(())
}

fn build_agent_args(
    server_ip: IpAddr,
    token: &str,
    opts: &JoinOptions,
    settings: &Settings,
) -> Result<k3s::AgentArgs> {
    let extra_args = shell_words::split(&settings.k3s.extra_agent_args)
        .context("Could not parse k3s.extra_agent_args in the config file")?;

    Ok(k3s::AgentArgs {
        server_ip,
        token: token.to_string(),
        node_name: opts
            .node_name
            .clone()
            .or_else(|| settings.defaults.node_name.clone()),
        extra_args,
    })
}

fn print_join_summary(server_ip: IpAddr) {
    crate::log_banner!("Worker joined");
    println!();
    println!("  Joined server:  https://{}:{}", server_ip, k3s::API_PORT);
    println!();
    println!("From the server host, confirm the node registered:");
    println!("  {}", "druid-dev verify".bold());
    println!("  kubectl get nodes");
    println!();
    println!("New nodes can take a minute to report Ready.");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;

    #[test]
    fn test_empty_token_rejected() {
        assert!(validate_token("").is_err());
        assert!(validate_token("   ").is_err());
    }

    #[test]
    fn test_short_token_accepted_with_warning() {
        // Short secrets are valid join credentials; only emptiness is fatal.
        assert!(validate_token("my-shared-secret").is_ok());
    }

    #[test]
    fn test_agent_args_pick_up_config() {
        let mut settings = Settings::default();
        settings.defaults.node_name = Some("druid-worker".into());
        settings.k3s.extra_agent_args = "--snapshotter native".into();

        let args = build_agent_args(
            "192.168.1.50".parse().unwrap(),
            "K10abc::server:xyz",
            &JoinOptions::default(),
            &settings,
        )
        .unwrap();

        assert_eq!(args.node_name.as_deref(), Some("druid-worker"));
        assert_eq!(args.extra_args, vec!["--snapshotter", "native"]);
        assert_eq!(args.server_url(), "https://192.168.1.50:6443");
    }
}
