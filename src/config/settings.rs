//! Configuration file support for druid-dev

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub behavior: Behavior,

    #[serde(default)]
    pub k3s: K3sSettings,

    #[serde(default)]
    pub druid: DruidSettings,
}

/// Default values for common operations
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Defaults {
    /// Node name registered with the cluster. Defaults to the machine
    /// hostname when unset (K3s behavior).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Directory holding the bundled sample datasets
    #[serde(default = "default_sample_data_dir")]
    pub sample_data_dir: String,

    /// Listen port for `druid-dev serve`
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Optional kubeconfig used by verify/deploy when --kubeconfig and
    /// KUBECONFIG are both unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_path: Option<String>,
}

/// Behavior settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Behavior {
    #[serde(default = "default_true")]
    pub confirm_destructive: bool,

    #[serde(default = "default_true")]
    pub show_progress: bool,
}

/// K3s installer settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct K3sSettings {
    /// Release channel passed to the installer (INSTALL_K3S_CHANNEL)
    #[serde(default = "default_k3s_channel")]
    pub channel: String,

    /// Exact version pin (INSTALL_K3S_VERSION); unset means the
    /// channel's latest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Extra arguments appended to the server install line,
    /// shell-words quoted
    #[serde(default)]
    pub extra_server_args: String,

    /// Extra arguments appended to the agent install line
    #[serde(default)]
    pub extra_agent_args: String,
}

/// Druid Helm chart coordinates
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DruidSettings {
    #[serde(default = "default_druid_release")]
    pub release: String,

    #[serde(default = "default_druid_namespace")]
    pub namespace: String,

    #[serde(default = "default_druid_repo_name")]
    pub repo_name: String,

    #[serde(default = "default_druid_repo_url")]
    pub repo_url: String,

    #[serde(default = "default_druid_chart")]
    pub chart: String,

    /// Chart version pin; unset means the repo's latest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_version: Option<String>,
}

// Default value functions
fn default_sample_data_dir() -> String {
    "demo/sample-data".to_string()
}

fn default_http_port() -> u16 {
    8888
}

fn default_true() -> bool {
    true
}

fn default_k3s_channel() -> String {
    "stable".to_string()
}

fn default_druid_release() -> String {
    "druid".to_string()
}

fn default_druid_namespace() -> String {
    "druid".to_string()
}

fn default_druid_repo_name() -> String {
    "druid-helm".to_string()
}

fn default_druid_repo_url() -> String {
    "https://asdf2014.github.io/druid-helm/".to_string()
}

fn default_druid_chart() -> String {
    "druid-helm/druid".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            node_name: None,
            sample_data_dir: default_sample_data_dir(),
            http_port: default_http_port(),
            kubeconfig_path: None,
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            confirm_destructive: default_true(),
            show_progress: default_true(),
        }
    }
}

impl Default for K3sSettings {
    fn default() -> Self {
        Self {
            channel: default_k3s_channel(),
            version: None,
            extra_server_args: String::new(),
            extra_agent_args: String::new(),
        }
    }
}

impl Default for DruidSettings {
    fn default() -> Self {
        Self {
            release: default_druid_release(),
            namespace: default_druid_namespace(),
            repo_name: default_druid_repo_name(),
            repo_url: default_druid_repo_url(),
            chart: default_druid_chart(),
            chart_version: None,
        }
    }
}

impl Settings {
    /// Load settings from file or return defaults
    pub fn load() -> Self {
        if let Some(path) = Self::find_config_file() {
            Self::load_from_file(&path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .druid-dev.toml in current directory
    /// 2. ~/.config/druid-dev/config.toml (XDG config directory)
    pub fn find_config_file() -> Option<PathBuf> {
        // Check current directory
        let local_config = PathBuf::from(".druid-dev.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        // Check XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("druid-dev").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }

    /// Generate example config file content
    pub fn example_config() -> String {
        let example = Settings::default();
        let header = "# druid-dev configuration file\n\
                      # Place this file at ~/.config/druid-dev/config.toml or .druid-dev.toml in your project\n\n";

        match toml::to_string_pretty(&example) {
            Ok(config) => format!("{}{}", header, config),
            Err(_) => {
                // Fallback in case serialization fails
                r#"# druid-dev configuration file
# Place this file at ~/.config/druid-dev/config.toml or .druid-dev.toml in your project

[defaults]
# node_name = "druid-server"        # Optional: defaults to the machine hostname
sample_data_dir = "demo/sample-data"
http_port = 8888
# kubeconfig_path = "/etc/rancher/k3s/k3s.yaml"  # Optional

[behavior]
confirm_destructive = true
show_progress = true

[k3s]
# Installer release channel (INSTALL_K3S_CHANNEL)
channel = "stable"
# version = "v1.31.4+k3s1"          # Optional: exact pin (INSTALL_K3S_VERSION)
extra_server_args = ""
extra_agent_args = ""

[druid]
release = "druid"
namespace = "druid"
repo_name = "druid-helm"
repo_url = "https://asdf2014.github.io/druid-helm/"
chart = "druid-helm/druid"
# chart_version = "0.3.5"           # Optional: chart pin
"#
                .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.defaults.sample_data_dir, "demo/sample-data");
        assert_eq!(settings.defaults.http_port, 8888);
        assert_eq!(settings.k3s.channel, "stable");
        assert!(settings.k3s.version.is_none());
        assert_eq!(settings.druid.namespace, "druid");
        assert!(settings.behavior.confirm_destructive);
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        assert!(toml_str.contains("sample_data_dir"));
        assert!(toml_str.contains("druid-helm/druid"));
    }

    #[test]
    fn test_settings_deserialization() {
        let toml_str = r#"
[defaults]
http_port = 9000
node_name = "rack-3"

[behavior]
confirm_destructive = false

[k3s]
version = "v1.31.4+k3s1"
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.defaults.http_port, 9000);
        assert_eq!(settings.defaults.node_name.as_deref(), Some("rack-3"));
        assert!(!settings.behavior.confirm_destructive);
        assert_eq!(settings.k3s.version.as_deref(), Some("v1.31.4+k3s1"));
        // Untouched sections keep their defaults
        assert_eq!(settings.druid.release, "druid");
        assert_eq!(settings.k3s.channel, "stable");
    }

    #[test]
    fn test_example_config() {
        let example = Settings::example_config();
        assert!(example.contains("druid-dev configuration"));
        assert!(example.contains("[defaults]"));
        assert!(example.contains("[k3s]"));
        assert!(example.contains("[druid]"));
    }
}
