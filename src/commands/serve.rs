//! `druid-dev serve`: expose the bundled datasets over HTTP
//!
//! Thin wrapper around the sample-data server: resolves the data
//! directory, prints the ingestion URLs and blocks on the listener.

use crate::config::settings::Settings;
use crate::sampledata;
use crate::utils::errors::DruidDevError;
use crate::utils::net;
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct ServeOptions {
    /// Listen port; the config file default is 8888
    pub port: Option<u16>,
    /// Directory to serve; the bundled demo/sample-data by default
    pub dir: Option<PathBuf>,
}

/// Serve the sample-data directory until interrupted
pub fn serve(opts: &ServeOptions, settings: &Settings) -> Result<()> {
    let port = opts.port.unwrap_or(settings.defaults.http_port);
    let configured = opts
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.defaults.sample_data_dir));
    let root = resolve_data_dir(&configured)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    runtime.block_on(async move {
        let listing = sampledata::read_listing(&root)
            .await
            .with_context(|| format!("Failed to read {}", root.display()))?;
        print_startup_banner(port, &root, &listing.files);
        sampledata::run(port, root).await
    })
}

/// Locate the sample-data directory. Relative paths are tried against
/// the working directory first, then against the binary's own location
/// so `druid-dev serve` works from anywhere inside a checkout.
fn resolve_data_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        if dir.is_dir() {
            return Ok(dir.to_path_buf());
        }
        return Err(DruidDevError::sample_data_missing(&dir.display().to_string()).into());
    }

    let from_cwd = env::current_dir()?.join(dir);
    if from_cwd.is_dir() {
        return Ok(from_cwd);
    }

    if let Ok(exe) = env::current_exe()
        && let Some(exe_dir) = exe.parent()
    {
        let from_exe = exe_dir.join(dir);
        if from_exe.is_dir() {
            return Ok(from_exe);
        }
    }

    Err(DruidDevError::sample_data_missing(&dir.display().to_string()).into())
}

fn print_startup_banner(port: u16, root: &Path, files: &[String]) {
    use owo_colors::OwoColorize;

    let host = net::detect_host_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| "localhost".to_string());

    println!();
    println!("{}", "Sample-data server".bold());
    println!("  Serving {}", root.display().to_string().bright_blue());
    println!();
    if files.is_empty() {
        println!("  {}", "No datasets found in this directory".yellow());
    } else {
        println!("  Datasets (paste one into the Druid console as an HTTP input source):");
        for file in files {
            println!("    http://{}:{}/{}", host, port, file.bright_green());
        }
    }
    println!();
    println!(
        "  File listing: {}",
        format!("http://{}:{}/", host, port).bright_blue()
    );
    println!("  {}", "Ctrl+C stops the server".dimmed());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_dir_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_data_dir(dir.path()).unwrap();
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let err = resolve_data_dir(Path::new("/nonexistent/sample-data")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sample-data"));
    }

    #[test]
    fn test_relative_dir_resolves_from_cwd() {
        // cargo runs tests with the package root as the working directory
        let resolved = resolve_data_dir(Path::new("src")).unwrap();
        assert!(resolved.ends_with("src"));
        assert!(resolved.is_absolute());
    }
}
