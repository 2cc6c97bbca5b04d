//! Enhanced error types with actionable suggestions

use colored::Colorize;
use thiserror::Error;

/// Enhanced error with suggestions and documentation links
#[derive(Error, Debug)]
#[error("{message}")]
pub struct DruidDevError {
    pub message: String,
    pub suggestions: Vec<String>,
    pub docs_link: Option<String>,
}

impl DruidDevError {
    /// Create a new error with suggestions
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestions: Vec::new(),
            docs_link: None,
        }
    }

    /// Add a suggestion to the error
    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a documentation link
    pub fn with_docs(mut self, link: impl Into<String>) -> Self {
        self.docs_link = Some(link.into());
        self
    }

    /// Display the error with suggestions
    pub fn display(&self) {
        crate::log_error!("{}", self.message);

        if !self.suggestions.is_empty() {
            println!();
            println!("{}", "Suggestions:".yellow().bold());
            for suggestion in &self.suggestions {
                println!("  {} {}", "→".blue(), suggestion);
            }
        }

        if let Some(docs) = &self.docs_link {
            println!();
            println!("{} {}", "Documentation:".cyan(), docs);
        }
    }

    // Common error patterns

    /// Root privileges required
    pub fn not_root(operation: &str) -> Self {
        Self::new(format!("'{}' must run as root", operation))
            .suggest(format!("Re-run with: sudo druid-dev {}", operation))
            .suggest("The K3s installer writes to /etc, /usr/local/bin and /var/lib")
    }

    /// Kubernetes API not reachable
    pub fn cluster_unreachable() -> Self {
        Self::new("Cannot reach the Kubernetes API server")
            .suggest("Check the k3s service: systemctl status k3s")
            .suggest("Inspect recent logs: journalctl -u k3s --no-pager -n 50")
            .suggest("Verify the kubeconfig: kubectl cluster-info")
            .with_docs("https://docs.k3s.io/troubleshooting")
    }

    /// Kubeconfig not found error
    pub fn kubeconfig_not_found(path: &str) -> Self {
        Self::new(format!("Kubeconfig not found: {}", path))
            .suggest("Run 'druid-dev server install' first on the server node")
            .suggest("Use --kubeconfig to point at an existing config")
            .suggest("K3s writes its kubeconfig to /etc/rancher/k3s/k3s.yaml")
    }

    /// Tool not found error
    pub fn tool_not_found(tool: &str, install_hint: &str) -> Self {
        Self::new(format!("Required tool '{}' not found", tool))
            .suggest(format!("Install with: {}", install_hint))
            .suggest("Ensure the tool is in your PATH")
    }

    /// Server node not reachable from this host
    pub fn server_unreachable(addr: &str) -> Self {
        Self::new(format!("K3s server {} is not reachable", addr))
            .suggest("Verify the server IP in cluster-info.txt on the server node")
            .suggest("Check that port 6443 is open between the two machines")
            .suggest("On the server: systemctl status k3s")
    }

    /// systemd unit failed to reach the active state
    pub fn service_not_active(unit: &str) -> Self {
        Self::new(format!("Service '{}' did not become active", unit))
            .suggest(format!("Check state: systemctl status {}", unit))
            .suggest(format!(
                "Inspect logs: journalctl -u {} --no-pager -n 100",
                unit
            ))
            .with_docs("https://docs.k3s.io/troubleshooting")
    }

    /// Join token was rejected or malformed
    pub fn invalid_token() -> Self {
        Self::new("The join token was rejected by the server")
            .suggest("Copy the token from cluster-info.txt on the server node")
            .suggest("Or read it directly: sudo cat /var/lib/rancher/k3s/server/node-token")
            .suggest("Print the full join command with: druid-dev server info")
    }

    /// cluster-info.txt missing
    pub fn cluster_info_missing(path: &str) -> Self {
        Self::new(format!("Cluster info file not found: {}", path))
            .suggest("Run 'druid-dev server install' on the server node first")
            .suggest("The file is created at the end of a successful install")
    }

    /// Readiness poll gave up
    pub fn poll_timeout(resource: &str) -> Self {
        Self::new(format!("Timed out waiting for {}", resource))
            .suggest("Check pod status: kubectl get pods -A")
            .suggest("Small machines can be slow on first pull; re-run 'druid-dev verify' in a few minutes")
            .suggest("Inspect events: kubectl get events -A --sort-by=.lastTimestamp")
    }

    /// Listen port already taken
    pub fn port_in_use(port: u16) -> Self {
        Self::new(format!("Port {} is already in use", port))
            .suggest(format!("Find the listener: ss -tlnp | grep {}", port))
            .suggest("Pick another port with: druid-dev serve --port <PORT>")
    }

    /// Sample data directory missing
    pub fn sample_data_missing(dir: &str) -> Self {
        Self::new(format!("Sample data directory not found: {}", dir))
            .suggest("Run from the project checkout, or pass --dir <PATH>")
            .suggest("The bundled datasets live in demo/sample-data")
    }
}

/// Helper to display error and exit
pub fn display_error_and_exit(error: DruidDevError) -> ! {
    error.display();
    std::process::exit(1);
}

/// Convert anyhow error to DruidDevError when possible
pub fn enhance_error(err: anyhow::Error) -> DruidDevError {
    // Errors that already carry curated suggestions pass through,
    // even with context layered on top of them
    let err = match err.downcast::<DruidDevError>() {
        Ok(enhanced) => return enhanced,
        Err(other) => other,
    };

    // {:#} renders the whole context chain, so root causes buried
    // under with_context() still match
    let err_str = format!("{:#}", err);

    // Pattern match common failure texts from kubectl/systemctl/bind
    if err_str.contains("connection refused") || err_str.contains("Unable to connect") {
        return DruidDevError::cluster_unreachable();
    }

    if err_str.contains("permission denied") || err_str.contains("Permission denied") {
        return DruidDevError::new(err_str)
            .suggest("This step needs root; re-run under sudo")
            .suggest("Verify file ownership under /etc/rancher/k3s");
    }

    if err_str.contains("cluster-info.txt") {
        return DruidDevError::cluster_info_missing(
            crate::config::cluster_info::CLUSTER_INFO_PATH,
        );
    }

    if err_str.contains("address already in use") || err_str.contains("Address already in use") {
        if let Some(port) = extract_port(&err_str) {
            return DruidDevError::port_in_use(port);
        }
    }

    // Default error with generic suggestion
    DruidDevError::new(err_str)
        .suggest("Run with --verbose for more details")
        .suggest("Check logs for additional context")
}

/// Extract a port number from an error message like "... 0.0.0.0:8888 ..."
/// The last colon followed by digits wins, so trailing text after the
/// address does not confuse it.
fn extract_port(msg: &str) -> Option<u16> {
    let mut port = None;
    for (idx, _) in msg.match_indices(':') {
        let digits: String = msg[idx + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if !digits.is_empty()
            && let Ok(p) = digits.parse()
        {
            port = Some(p);
        }
    }
    port
}
