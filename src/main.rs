//! druid-dev CLI - two-node Apache Druid demo clusters on K3s

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use druid_dev::commands;
use druid_dev::config::settings::Settings;
use druid_dev::log_info;
use druid_dev::utils::errors;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "druid-dev")]
#[command(author, version, about = "Provision a two-node Apache Druid demo cluster on K3s", long_about = None)]
struct Cli {
    /// Verbose output (can be used multiple times: -v, -vv)
    /// -v: DEBUG, -vv: TRACE
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dry-run mode: show what would be done without making changes
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the K3s server node
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },

    /// Manage worker nodes
    Worker {
        #[command(subcommand)]
        command: WorkerCommands,
    },

    /// Install Apache Druid from the Helm chart
    Deploy {
        /// Replacement Helm values file (the bundled small-footprint
        /// values are used when omitted)
        #[arg(long)]
        values: Option<PathBuf>,

        /// Inline chart override in helm --set syntax (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Chart version pin
        #[arg(long)]
        chart_version: Option<String>,

        /// Return as soon as helm does instead of waiting for pods
        #[arg(long)]
        skip_wait: bool,

        /// Path to kubeconfig file
        #[arg(short, long, env = "KUBECONFIG")]
        kubeconfig: Option<String>,
    },

    /// Run read-only health checks against the cluster
    Verify {
        /// Path to kubeconfig file
        #[arg(short, long, env = "KUBECONFIG")]
        kubeconfig: Option<String>,
    },

    /// Remove K3s, Druid and all cluster state from this host
    Cleanup {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Serve the bundled sample datasets over HTTP
    Serve {
        /// Listen port
        #[arg(short, long, env = "DRUID_DEV_PORT")]
        port: Option<u16>,

        /// Directory to serve instead of the bundled demo/sample-data
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Check prerequisites
    Check {
        /// Only the tools `deploy` needs
        #[arg(long)]
        deploy: bool,

        /// Only the tools `cleanup` needs
        #[arg(long)]
        cleanup: bool,
    },

    /// Interactive debugging menu
    Interactive {
        /// Path to kubeconfig file
        #[arg(short, long, env = "KUBECONFIG")]
        kubeconfig: Option<String>,
    },

    /// Inspect or generate the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ServerCommands {
    /// Install K3s in server mode on this host (requires root)
    Install {
        /// Address advertised to workers (autodetected when omitted)
        #[arg(long)]
        server_ip: Option<IpAddr>,

        /// Node name registered with the cluster
        #[arg(long, env = "K3S_NODE_NAME")]
        node_name: Option<String>,
    },

    /// Show the saved connection details and worker join command
    Info {
        /// Print the node token in full
        #[arg(long)]
        show_token: bool,
    },
}

#[derive(Subcommand)]
enum WorkerCommands {
    /// Join this host to an existing server as an agent (requires root)
    Join {
        /// Server address, from cluster-info.txt on the server
        server_ip: IpAddr,

        /// Node token, from cluster-info.txt on the server
        token: String,

        /// Node name registered with the cluster
        #[arg(long, env = "K3S_NODE_NAME")]
        node_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Print an annotated example configuration file
    Example,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if cli.dry_run {
        druid_dev::utils::dryrun::set_dry_run(true);
        log_info!("DRY RUN MODE: no changes will be made");
        println!();
    }

    let settings = Settings::load();

    let result = match cli.command {
        Commands::Server { command } => handle_server_command(command, &settings),
        Commands::Worker { command } => handle_worker_command(command, &settings),
        Commands::Deploy {
            values,
            set,
            chart_version,
            skip_wait,
            kubeconfig,
        } => {
            let kc = resolve_kubeconfig(kubeconfig, &settings);
            commands::deploy::deploy(
                &commands::deploy::DeployOptions {
                    values_file: values,
                    set_overrides: set,
                    chart_version,
                    skip_wait,
                },
                &settings,
                kc.as_deref(),
            )
        }
        Commands::Verify { kubeconfig } => {
            let kc = resolve_kubeconfig(kubeconfig, &settings);
            commands::verify::verify(
                &settings.druid.namespace,
                &settings.druid.release,
                kc.as_deref(),
            )
        }
        Commands::Cleanup { yes } => {
            commands::cleanup::cleanup(&commands::cleanup::CleanupOptions { yes }, &settings)
        }
        Commands::Serve { port, dir } => {
            commands::serve::serve(&commands::serve::ServeOptions { port, dir }, &settings)
        }
        Commands::Check { deploy, cleanup } => {
            commands::check::check(&commands::check::CheckOptions { deploy, cleanup })
        }
        Commands::Interactive { kubeconfig } => {
            let kc = resolve_kubeconfig(kubeconfig, &settings);
            commands::interactive::show_menu(&settings.druid.namespace, kc.as_deref())
        }
        Commands::Config { command } => handle_config_command(command, &settings),
        Commands::Completion { shell } => handle_completion_command(shell),
        Commands::Version => handle_version_command(),
    };

    if let Err(e) = result {
        errors::display_error_and_exit(errors::enhance_error(e));
    }
}

/// Default shows the tool's own narration; -v raises the filter.
/// RUST_LOG takes precedence when set.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

/// --kubeconfig / KUBECONFIG first, then the config file, then
/// kubectl's own resolution order
fn resolve_kubeconfig(cli_value: Option<String>, settings: &Settings) -> Option<PathBuf> {
    cli_value
        .map(PathBuf::from)
        .or_else(|| settings.defaults.kubeconfig_path.as_ref().map(PathBuf::from))
}

fn handle_server_command(command: ServerCommands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        ServerCommands::Install {
            server_ip,
            node_name,
        } => commands::server::install(
            &commands::server::InstallOptions {
                server_ip,
                node_name,
            },
            settings,
        ),
        ServerCommands::Info { show_token } => commands::server::info(show_token),
    }
}

fn handle_worker_command(command: WorkerCommands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        WorkerCommands::Join {
            server_ip,
            token,
            node_name,
        } => commands::worker::join(
            server_ip,
            &token,
            &commands::worker::JoinOptions { node_name },
            settings,
        ),
    }
}

fn handle_config_command(command: ConfigCommands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            match Settings::find_config_file() {
                Some(path) => log_info!("Configuration loaded from {}", path.display()),
                None => log_info!("No configuration file found, showing defaults"),
            }
            let rendered = toml::to_string_pretty(settings)?;
            println!();
            println!("{}", rendered);
            Ok(())
        }
        ConfigCommands::Example => {
            println!("{}", Settings::example_config());
            Ok(())
        }
    }
}

fn handle_completion_command(shell: Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "druid-dev", &mut io::stdout());
    Ok(())
}

fn handle_version_command() -> anyhow::Result<()> {
    println!("druid-dev {}", env!("CARGO_PKG_VERSION"));
    println!("Two-node Apache Druid demo clusters on K3s");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_worker_join_requires_both_arguments() {
        // No arguments
        assert!(Cli::try_parse_from(["druid-dev", "worker", "join"]).is_err());
        // Only the server address
        assert!(Cli::try_parse_from(["druid-dev", "worker", "join", "192.168.1.50"]).is_err());
        // Both present parses cleanly
        let cli = Cli::try_parse_from([
            "druid-dev",
            "worker",
            "join",
            "192.168.1.50",
            "K10abc::server:xyz",
        ])
        .unwrap();
        match cli.command {
            Commands::Worker {
                command:
                    WorkerCommands::Join {
                        server_ip, token, ..
                    },
            } => {
                assert_eq!(server_ip.to_string(), "192.168.1.50");
                assert_eq!(token, "K10abc::server:xyz");
            }
            _ => panic!("parsed into the wrong command"),
        }
    }

    #[test]
    fn test_worker_join_rejects_malformed_address() {
        assert!(Cli::try_parse_from(["druid-dev", "worker", "join", "not-an-ip", "tok"]).is_err());
    }

    #[test]
    fn test_deploy_set_flag_is_repeatable() {
        let cli = Cli::try_parse_from([
            "druid-dev",
            "deploy",
            "--set",
            "broker.replicaCount=2",
            "--set",
            "router.serviceType=NodePort",
        ])
        .unwrap();
        match cli.command {
            Commands::Deploy { set, .. } => assert_eq!(set.len(), 2),
            _ => panic!("parsed into the wrong command"),
        }
    }

    #[test]
    fn test_server_install_accepts_explicit_ip() {
        let cli =
            Cli::try_parse_from(["druid-dev", "server", "install", "--server-ip", "10.0.0.7"])
                .unwrap();
        match cli.command {
            Commands::Server {
                command: ServerCommands::Install { server_ip, .. },
            } => assert_eq!(server_ip.map(|ip| ip.to_string()).as_deref(), Some("10.0.0.7")),
            _ => panic!("parsed into the wrong command"),
        }
    }
}
