//! The cluster-info.txt file written at the end of a server install
//!
//! The file is the hand-off point between the two machines: the
//! operator reads it on the server and pastes the join command on the
//! worker. It carries exactly three KEY=value fields; everything else
//! is comment text. The node token authenticates joins, so the file is
//! written mode 600.

use anyhow::{Context, Result, anyhow, bail};
use std::fmt::Write as _;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

/// Default location, inside the K3s server state directory
pub const CLUSTER_INFO_PATH: &str = "/var/lib/rancher/k3s/server/cluster-info.txt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub server_ip: IpAddr,
    pub server_url: String,
    pub node_token: String,
}

impl ClusterInfo {
    pub fn new(server_ip: IpAddr, node_token: impl Into<String>) -> Self {
        Self {
            server_ip,
            server_url: format!("https://{}:6443", server_ip),
            node_token: node_token.into(),
        }
    }

    /// The ready-to-paste command for the worker machine
    pub fn join_command(&self) -> String {
        format!(
            "sudo druid-dev worker join {} {}",
            self.server_ip, self.node_token
        )
    }

    /// Token shortened for terminal display
    pub fn masked_token(&self) -> String {
        mask_token(&self.node_token)
    }

    /// File body: three fields plus the join command as comments
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# druid-dev cluster info");
        let _ = writeln!(out, "# Run this on the worker machine to join it:");
        let _ = writeln!(out, "#   {}", self.join_command());
        let _ = writeln!(out, "SERVER_IP={}", self.server_ip);
        let _ = writeln!(out, "SERVER_URL={}", self.server_url);
        let _ = writeln!(out, "NODE_TOKEN={}", self.node_token);
        out
    }

    /// Write the file with owner-only permissions (mode 600)
    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        file.write_all(self.render().as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        // An existing file keeps its old mode on open, so set it again.
        let mut perms = file.metadata()?.permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o600);
        file.set_permissions(perms)?;

        Ok(())
    }

    /// Parse a cluster-info.txt body. Comments and blank lines are
    /// skipped; the three documented fields must each appear exactly
    /// once and nothing else is accepted.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut server_ip: Option<IpAddr> = None;
        let mut server_url: Option<String> = None;
        let mut node_token: Option<String> = None;

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| anyhow!("cluster-info.txt line {}: expected KEY=value", lineno + 1))?;

            match key {
                "SERVER_IP" => {
                    if server_ip.is_some() {
                        bail!("cluster-info.txt: duplicate SERVER_IP");
                    }
                    server_ip = Some(value.parse().context("Invalid SERVER_IP")?);
                }
                "SERVER_URL" => {
                    if server_url.is_some() {
                        bail!("cluster-info.txt: duplicate SERVER_URL");
                    }
                    server_url = Some(value.to_string());
                }
                "NODE_TOKEN" => {
                    if node_token.is_some() {
                        bail!("cluster-info.txt: duplicate NODE_TOKEN");
                    }
                    node_token = Some(value.to_string());
                }
                other => bail!("cluster-info.txt: unknown field '{}'", other),
            }
        }

        Ok(Self {
            server_ip: server_ip.ok_or_else(|| anyhow!("cluster-info.txt: missing SERVER_IP"))?,
            server_url: server_url
                .ok_or_else(|| anyhow!("cluster-info.txt: missing SERVER_URL"))?,
            node_token: node_token
                .ok_or_else(|| anyhow!("cluster-info.txt: missing NODE_TOKEN"))?,
        })
    }

    /// Load and parse the file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read cluster-info.txt at {}", path.display()))?;
        Self::parse(&contents)
    }
}

/// Show only the first characters of a token
pub fn mask_token(token: &str) -> String {
    let visible = token.len().min(8);
    format!("{}...", &token[..visible])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    fn sample() -> ClusterInfo {
        ClusterInfo::new(
            "192.168.1.50".parse().unwrap(),
            "K10abc123def456::server:s3cr3t",
        )
    }

    #[test]
    fn test_render_has_exactly_three_fields() {
        let rendered = sample().render();
        let fields: Vec<&str> = rendered
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
            .collect();
        assert_eq!(fields.len(), 3);
        assert!(fields[0].starts_with("SERVER_IP="));
        assert!(fields[1].starts_with("SERVER_URL="));
        assert!(fields[2].starts_with("NODE_TOKEN="));
        assert!(rendered.contains("druid-dev worker join 192.168.1.50"));
    }

    #[test]
    fn test_round_trip() {
        let info = sample();
        let parsed = ClusterInfo::parse(&info.render()).unwrap();
        assert_eq!(parsed, info);
        assert_eq!(parsed.server_url, "https://192.168.1.50:6443");
    }

    #[test]
    fn test_write_mode_600() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster-info.txt");
        sample().write(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let loaded = ClusterInfo::load(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn test_write_resets_mode_on_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster-info.txt");
        std::fs::write(&path, "old").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o644);
        std::fs::set_permissions(&path, perms).unwrap();

        sample().write(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_parse_rejects_unknown_field() {
        let body = "SERVER_IP=10.0.0.1\nSERVER_URL=https://10.0.0.1:6443\nNODE_TOKEN=t\nEXTRA=nope\n";
        let err = ClusterInfo::parse(body).unwrap_err();
        assert!(err.to_string().contains("unknown field 'EXTRA'"));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let body = "SERVER_IP=10.0.0.1\nSERVER_URL=https://10.0.0.1:6443\n";
        let err = ClusterInfo::parse(body).unwrap_err();
        assert!(err.to_string().contains("missing NODE_TOKEN"));
    }

    #[test]
    fn test_parse_rejects_duplicate_field() {
        let body = "SERVER_IP=10.0.0.1\nSERVER_IP=10.0.0.2\n";
        let err = ClusterInfo::parse(body).unwrap_err();
        assert!(err.to_string().contains("duplicate SERVER_IP"));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("K10abcdef0123"), "K10abcde...");
        assert_eq!(mask_token("abc"), "abc...");
    }
}
