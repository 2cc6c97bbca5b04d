//! Server node provisioning
//!
//! `server install` turns the current host into the K3s control plane
//! for the two-node demo, installs helm, prepares the druid namespace
//! and writes cluster-info.txt with the credentials a worker needs to
//! join. `server info` prints that file back without reinstalling.

use crate::config::cluster_info::{CLUSTER_INFO_PATH, ClusterInfo};
use crate::config::settings::Settings;
use crate::install::{helm_cli, k3s};
use crate::k8s::kubectl;
use crate::utils::dryrun::{self, exec_unless_dry_run, exec_unless_dry_run_with_default};
use crate::utils::polling::PollConfig;
use crate::utils::prereqs::{CommonPrereqs, Prerequisite};
use crate::utils::progress::with_spinner;
use crate::utils::{net, privilege, prompt, service};
use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

/// Attempts for the `systemctl is-active k3s` poll, 5s apart
const SERVICE_POLL_ATTEMPTS: u32 = 30;

/// Attempts for the /readyz poll once the unit reports active
const API_POLL_ATTEMPTS: u32 = 24;

/// Placeholder token used when --dry-run skips reading the real one
const DRY_RUN_TOKEN: &str = "K10<generated-after-install>";

#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Address advertised to workers; autodetected when unset
    pub server_ip: Option<IpAddr>,
    /// Node name registered with the cluster
    pub node_name: Option<String>,
}

/// Install and configure the K3s server on this host
pub fn install(opts: &InstallOptions, settings: &Settings) -> Result<()> {
    crate::log_banner!("K3s Server Installation");

    privilege::require_root("install the K3s server")?;

    let systemctl = CommonPrereqs::systemctl();
    if let Err(e) = systemctl.check() {
        return Err(anyhow!("{} ({})", e, systemctl.install_hint()));
    }

    if k3s::is_installed() && service::is_active(k3s::SERVER_SERVICE) {
        crate::log_warn!("A K3s server is already active on this host");
        if !dryrun::is_dry_run()
            && !prompt::confirm("Re-run the installer over the existing server?")?
        {
            crate::log_info!("Keeping the existing installation");
            return info(false);
        }
    }

    let server_ip = match opts.server_ip {
        Some(ip) => ip,
        None => net::detect_host_ip()
            .context("Could not detect this host's IP; pass --server-ip explicitly")?,
    };
    crate::log_info!("Advertising server address {}", server_ip);

    let server_args = build_server_args(server_ip, opts, settings)?;
    let env = install_env(settings);
    if let Some(version) = &env.version {
        crate::log_info!("Pinning K3s version {}", version);
    }

    exec_unless_dry_run("download and run the K3s installer (server mode)", || {
        let script = with_spinner("Downloading the K3s installer...", k3s::fetch_install_script)?;
        crate::log_info!("Running the installer, this takes a minute or two...");
        k3s::run_installer(script.path(), &server_args.to_args(), &env)
    })?;

    let kubeconfig = Path::new(k3s::KUBECONFIG_PATH);

    if !dryrun::is_dry_run() {
        service::wait_active(k3s::SERVER_SERVICE, SERVICE_POLL_ATTEMPTS)?;
        PollConfig::every_five_secs("Kubernetes API", API_POLL_ATTEMPTS)
            .wait_until(|| kubectl::api_ready(Some(kubeconfig)))?;
        crate::log_info!("Kubernetes API is serving");
    } else {
        dryrun::log_action(&format!(
            "wait for the {} unit and the API /readyz endpoint",
            k3s::SERVER_SERVICE
        ));
    }

    let token = exec_unless_dry_run_with_default(
        "read the node token",
        DRY_RUN_TOKEN.to_string(),
        k3s::read_node_token,
    )?;

    exec_unless_dry_run("copy the kubeconfig to ~/.kube/config", || {
        setup_kubectl_access(kubeconfig)
    })?;

    if helm_cli::is_installed() {
        crate::log_info!("helm is already installed, skipping");
    } else {
        exec_unless_dry_run("install helm", helm_cli::install)?;
    }

    exec_unless_dry_run(
        &format!("create the '{}' namespace", settings.druid.namespace),
        || kubectl::ensure_namespace(&settings.druid.namespace, Some(kubeconfig)),
    )?;

    let cluster_info = ClusterInfo::new(server_ip, token);
    exec_unless_dry_run(&format!("write {}", CLUSTER_INFO_PATH), || {
        cluster_info.write(Path::new(CLUSTER_INFO_PATH))
    })?;

    print_install_summary(&cluster_info);
    Ok(())
}

/// Print the connection details saved by `server install`
pub fn info(show_token: bool) -> Result<()> {
    let cluster_info = ClusterInfo::load(Path::new(CLUSTER_INFO_PATH))
        .with_context(|| format!("Failed to read {}", CLUSTER_INFO_PATH))?;

    println!();
    println!("{}", "Cluster connection details".bold());
    println!("  Server IP:   {}", cluster_info.server_ip);
    println!("  Server URL:  {}", cluster_info.server_url);
    if show_token {
        println!("  Node token:  {}", cluster_info.node_token);
    } else {
        println!(
            "  Node token:  {} (pass --show-token for the full value)",
            cluster_info.masked_token()
        );
    }
    println!();
    println!("Join a worker with:");
    println!("  {}", cluster_info.join_command().bold());
    println!();
    Ok(())
}

/// Resolve the installer argument list from flags, config and defaults
fn build_server_args(
    server_ip: IpAddr,
    opts: &InstallOptions,
    settings: &Settings,
) -> Result<k3s::ServerArgs> {
    let extra_args = shell_words::split(&settings.k3s.extra_server_args)
        .context("Could not parse k3s.extra_server_args in the config file")?;

    Ok(k3s::ServerArgs {
        advertise_ip: server_ip,
        node_name: opts
            .node_name
            .clone()
            .or_else(|| settings.defaults.node_name.clone()),
        extra_args,
    })
}

/// Installer channel/version, with the environment taking precedence
/// over the config file (the installer script reads the same variable)
fn install_env(settings: &Settings) -> k3s::InstallEnv {
    let version = std::env::var("INSTALL_K3S_VERSION")
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| settings.k3s.version.clone());

    k3s::InstallEnv {
        channel: settings.k3s.channel.clone(),
        version,
    }
}

/// Copy the K3s kubeconfig into the invoking user's home so plain
/// kubectl works. An existing config is never overwritten.
fn setup_kubectl_access(kubeconfig: &Path) -> Result<()> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine the home directory"))?;
    let kube_dir = home.join(".kube");
    let target: PathBuf = kube_dir.join("config");

    if target.exists() {
        crate::log_warn!(
            "{} already exists, leaving it alone. Use: export KUBECONFIG={}",
            target.display(),
            kubeconfig.display()
        );
        return Ok(());
    }

    fs::create_dir_all(&kube_dir)
        .with_context(|| format!("Failed to create {}", kube_dir.display()))?;
    fs::copy(kubeconfig, &target).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            kubeconfig.display(),
            target.display()
        )
    })?;
    crate::log_info!("Wrote kubeconfig to {}", target.display());
    Ok(())
}

fn print_install_summary(cluster_info: &ClusterInfo) {
    crate::log_banner!("Server installation complete");
    println!();
    println!("  Server URL:    {}", cluster_info.server_url);
    println!("  Cluster info:  {}", CLUSTER_INFO_PATH);
    println!("  Node token:    {}", cluster_info.masked_token());
    println!();
    println!("Join a worker node by running this on the worker:");
    println!();
    println!("  {}", cluster_info.join_command().bold().green());
    println!();
    println!("Then, from this host:");
    println!("  druid-dev verify          # check both nodes are Ready");
    println!("  druid-dev deploy          # install Druid");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::Settings;

    #[test]
    fn test_node_name_flag_beats_config() {
        let mut settings = Settings::default();
        settings.defaults.node_name = Some("from-config".into());
        let opts = InstallOptions {
            server_ip: None,
            node_name: Some("from-flag".into()),
        };
        let args = build_server_args("10.0.0.5".parse().unwrap(), &opts, &settings).unwrap();
        assert_eq!(args.node_name.as_deref(), Some("from-flag"));
    }

    #[test]
    fn test_extra_server_args_are_shell_split() {
        let mut settings = Settings::default();
        settings.k3s.extra_server_args = "--disable servicelb --cluster-cidr '10.44.0.0/16'".into();
        let opts = InstallOptions::default();
        let args = build_server_args("10.0.0.5".parse().unwrap(), &opts, &settings).unwrap();
        assert_eq!(
            args.extra_args,
            vec!["--disable", "servicelb", "--cluster-cidr", "10.44.0.0/16"]
        );
        assert_eq!(args.node_name, None);
    }
}
