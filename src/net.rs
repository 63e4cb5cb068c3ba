//! Host addressing helpers
//!
//! Endpoints are identified by `"hostname:port"` pairs. A blank local host in
//! the dispatch configuration triggers network-interface auto-detection so the
//! remote side knows where to ship results back to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::UdpSocket;
use std::str::FromStr;

use crate::error::SkyhookError;

/// A `hostname:port` endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for HostPort {
    type Err = SkyhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| SkyhookError::InvalidHostPort(s.to_string()))?;
        if host.is_empty() {
            return Err(SkyhookError::InvalidHostPort(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| SkyhookError::InvalidHostPort(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

/// Detect the address of the outbound-facing network interface.
///
/// Binds an unconnected UDP socket and "connects" it to a routable address;
/// no packet is sent, but the kernel picks the local interface that would be
/// used, which is the address remote peers can reach us on. Falls back to
/// loopback when the host has no route at all.
pub fn detect_local_host() -> String {
    let probe = || -> std::io::Result<String> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect(("198.51.100.1", 53))?;
        Ok(socket.local_addr()?.ip().to_string())
    };
    probe().unwrap_or_else(|_| "127.0.0.1".to_string())
}

/// Resolve the configured local host, auto-detecting when blank.
pub fn resolve_local_host(configured: &str) -> String {
    if configured.trim().is_empty() {
        detect_local_host()
    } else {
        configured.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_port() {
        let hp: HostPort = "worker-3:8022".parse().unwrap();
        assert_eq!(hp.host, "worker-3");
        assert_eq!(hp.port, 8022);
        assert_eq!(hp.to_string(), "worker-3:8022");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("no-port".parse::<HostPort>().is_err());
        assert!(":22".parse::<HostPort>().is_err());
        assert!("host:notaport".parse::<HostPort>().is_err());
        assert!("host:99999".parse::<HostPort>().is_err());
    }

    #[test]
    fn test_blank_host_auto_detects() {
        let host = resolve_local_host("");
        assert!(!host.is_empty());

        let host = resolve_local_host("  ");
        assert!(!host.is_empty());
    }

    #[test]
    fn test_configured_host_wins() {
        assert_eq!(resolve_local_host("10.0.0.7"), "10.0.0.7");
    }
}
