//! Helm binary installation via the upstream get-helm-3 script

use crate::utils::progress::with_spinner_result;
use anyhow::{Context, Result, anyhow};
use std::process::Command;
use std::time::Duration;

pub const HELM_INSTALL_SCRIPT_URL: &str =
    "https://raw.githubusercontent.com/helm/helm/main/scripts/get-helm-3";

/// Whether helm is already on PATH
pub fn is_installed() -> bool {
    which::which("helm").is_ok()
}

/// Install helm with the upstream script; a no-op when already present
pub fn install() -> Result<()> {
    if is_installed() {
        crate::log_info!("helm already installed, skipping");
        return Ok(());
    }

    let body = with_spinner_result(
        "Downloading the Helm install script...",
        "Helm install script downloaded",
        download_install_script,
    )?;

    let script = {
        use std::io::Write;
        let mut file = tempfile::Builder::new()
            .prefix("get-helm-3-")
            .suffix(".sh")
            .tempfile()
            .context("Failed to stage the Helm install script")?;
        file.write_all(body.as_bytes())
            .context("Failed to write the Helm install script")?;
        file
    };

    // get-helm-3 is a bash script (it uses bashisms), not plain sh
    let status = Command::new("bash")
        .arg(script.path())
        .status()
        .context("Failed to run the Helm install script")?;

    if !status.success() {
        return Err(anyhow!("Helm install script exited with {}", status));
    }

    if !is_installed() {
        return Err(anyhow!("helm still missing after the install script ran"));
    }

    crate::log_info!("helm installed successfully");
    Ok(())
}

fn download_install_script() -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;

    client
        .get(HELM_INSTALL_SCRIPT_URL)
        .send()
        .context("Failed to download the Helm install script")?
        .error_for_status()
        .context("Helm install script download returned an error status")?
        .text()
        .context("Failed to read the Helm install script body")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_url_is_https() {
        assert!(HELM_INSTALL_SCRIPT_URL.starts_with("https://"));
    }
}
