//! Interactive menu for poking at the running cluster
//!
//! Wraps the kubectl invocations people reach for most while demoing:
//! console access, component logs, status at a glance. Every action
//! returns to the menu, including the ones stopped with Ctrl+C.

use anyhow::Result;
use std::io::{self, Write};
use std::path::Path;

use crate::config::cluster_info::{CLUSTER_INFO_PATH, ClusterInfo};
use crate::k8s::{helm, kubectl};
use crate::utils::prompt;

/// Local port the console port-forward binds; 8888 stays free for the
/// sample-data server
const CONSOLE_LOCAL_PORT: u16 = 9088;

/// Show the interactive menu for cluster operations
pub fn show_menu(namespace: &str, kubeconfig: Option<&Path>) -> Result<()> {
    crate::log_banner!("Interactive Menu");

    loop {
        println!();
        println!("Available actions:");
        println!(
            "  1) Port-forward to the Druid console (http://localhost:{})",
            CONSOLE_LOCAL_PORT
        );
        println!("  2) View broker logs");
        println!("  3) View coordinator logs");
        println!("  4) View historical logs");
        println!("  5) Show cluster status");
        println!("  6) Print the worker join command");
        println!("  7) kubectl shell (interactive)");
        println!("  8) Exit");
        println!();
        print!("Select an action [1-8]: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        match input.trim() {
            "1" => port_forward_console(namespace, kubeconfig)?,
            "2" => view_component_logs(namespace, "broker", kubeconfig)?,
            "3" => view_component_logs(namespace, "coordinator", kubeconfig)?,
            "4" => view_component_logs(namespace, "historical", kubeconfig)?,
            "5" => show_cluster_status(namespace, kubeconfig)?,
            "6" => print_join_command()?,
            "7" => kubectl_shell(kubeconfig)?,
            "8" => {
                crate::log_info!("Exiting...");
                break;
            }
            _ => {
                crate::log_error!("Invalid selection. Please choose 1-8.");
            }
        }
    }

    Ok(())
}

/// Port-forward to the Druid router, which fronts the web console
fn port_forward_console(namespace: &str, kubeconfig: Option<&Path>) -> Result<()> {
    crate::log_info!(
        "Access the Druid console at: http://localhost:{}",
        CONSOLE_LOCAL_PORT
    );
    crate::log_info!("Press Ctrl+C to stop port-forwarding and return to the menu");

    kubectl::port_forward(
        namespace,
        "svc/druid-router",
        &format!("{}:8888", CONSOLE_LOCAL_PORT),
        kubeconfig,
    )
}

/// Follow the logs of one Druid component
fn view_component_logs(namespace: &str, component: &str, kubeconfig: Option<&Path>) -> Result<()> {
    crate::log_info!("Showing {} logs...", component);
    crate::log_info!("Press Ctrl+C to stop and return to the menu");

    // Ctrl+C makes kubectl exit non-zero; back to the menu either way
    kubectl::tail_logs(
        namespace,
        &format!("app=druid,component={}", component),
        100,
        true,
        kubeconfig,
    )
    .ok();
    Ok(())
}

/// Nodes, pods and services at a glance
fn show_cluster_status(namespace: &str, kubeconfig: Option<&Path>) -> Result<()> {
    crate::log_info!("Nodes:");
    kubectl::run_kubectl(&["get", "nodes", "-o", "wide"], kubeconfig).ok();
    println!();

    crate::log_info!("Pods in '{}':", namespace);
    kubectl::run_kubectl(&["get", "pods", "-n", namespace], kubeconfig).ok();
    println!();

    crate::log_info!("Services in '{}':", namespace);
    kubectl::run_kubectl(&["get", "svc", "-n", namespace], kubeconfig).ok();
    println!();

    crate::log_info!("Helm releases in '{}':", namespace);
    helm::run_helm(&["list", "-n", namespace], kubeconfig).ok();
    println!();

    prompt::wait_for_enter("Press Enter to return to the menu")?;
    Ok(())
}

/// Print the join command saved by `server install`
fn print_join_command() -> Result<()> {
    match ClusterInfo::load(Path::new(CLUSTER_INFO_PATH)) {
        Ok(info) => {
            println!();
            println!("Run this on the worker host:");
            println!("  {}", info.join_command());
            println!();
        }
        Err(_) => {
            crate::log_warn!(
                "{} not found; run 'druid-dev server install' on this host first",
                CLUSTER_INFO_PATH
            );
        }
    }
    Ok(())
}

/// Interactive kubectl shell
fn kubectl_shell(kubeconfig: Option<&Path>) -> Result<()> {
    crate::log_info!("Starting kubectl shell...");
    crate::log_info!("Type 'exit' to return to the menu");
    println!();

    loop {
        print!("kubectl> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        let input = input.trim();
        if input == "exit" || input.is_empty() {
            break;
        }

        // shell-words so quoted args (-o jsonpath='{...}') survive
        let args = match shell_words::split(input) {
            Ok(args) => args,
            Err(e) => {
                crate::log_error!("Could not parse that line: {}", e);
                continue;
            }
        };
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();

        kubectl::run_kubectl(&arg_refs, kubeconfig).ok();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_console_forward_leaves_sample_port_free() {
        assert_ne!(super::CONSOLE_LOCAL_PORT, 8888);
    }
}
