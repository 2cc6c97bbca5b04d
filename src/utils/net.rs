//! Network probes and address discovery
//!
//! Reachability is established the same way the shell tooling does it:
//! one ICMP ping for a quick signal, then a raw TCP connect against the
//! K3s API port as the authoritative check.

use anyhow::{Context, Result, anyhow};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::process::Command;
use std::time::Duration;

/// Single ICMP echo with a 2s deadline. Returns false on any failure,
/// including ping itself being missing; call sites treat this as a
/// soft signal since ICMP is often filtered.
pub fn ping(host: IpAddr) -> bool {
    Command::new("ping")
        .args(["-c", "1", "-W", "2"])
        .arg(host.to_string())
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Raw TCP connect with a timeout. This is the authoritative
/// reachability check for the API port.
pub fn tcp_reachable(addr: SocketAddr, timeout: Duration) -> bool {
    TcpStream::connect_timeout(&addr, timeout).is_ok()
}

/// Primary IP of this host, from `hostname -I` (first address listed)
pub fn detect_host_ip() -> Result<IpAddr> {
    let output = Command::new("hostname")
        .arg("-I")
        .output()
        .context("Failed to run 'hostname -I'")?;

    if !output.status.success() {
        return Err(anyhow!("'hostname -I' exited with {}", output.status));
    }

    parse_first_ip(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        anyhow!("Could not determine this host's IP address; pass --server-ip explicitly")
    })
}

/// First parseable address in a whitespace-separated list
pub fn parse_first_ip(raw: &str) -> Option<IpAddr> {
    raw.split_whitespace().find_map(|tok| tok.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_parse_first_ip() {
        assert_eq!(
            parse_first_ip("192.168.1.50 172.17.0.1 \n"),
            Some("192.168.1.50".parse().unwrap())
        );
        assert_eq!(
            parse_first_ip("fe80::1 10.0.0.9"),
            Some("fe80::1".parse().unwrap())
        );
        assert_eq!(parse_first_ip(""), None);
        assert_eq!(parse_first_ip("not-an-ip"), None);
    }

    #[test]
    fn test_tcp_reachable_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(tcp_reachable(addr, Duration::from_secs(1)));
    }
}
