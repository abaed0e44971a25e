//! Discovery Record Types
//!
//! Values that flow through a single discovery round: the raw registry entry,
//! its canonical `host:port` form, and the resolved socket address.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, SocketAddr};

/// One instance entry as reported by the registry.
///
/// Equality and hashing only consider `(ip, port)`. The same instance can show up
/// under several health entries or service names and must collapse to one record.
#[derive(Debug, Clone)]
pub struct RawDiscoveryRecord {
    /// Registry-reported host. Not validated.
    pub ip: String,
    /// Registry-reported port. Not range checked until resolution.
    pub port: i64,
    /// Registry service ID, kept for diagnostics
    pub service: Option<String>,
    /// Registry node name, kept for diagnostics
    pub node: Option<String>,
}

impl RawDiscoveryRecord {
    pub fn new(ip: impl Into<String>, port: i64) -> Self {
        Self {
            ip: ip.into(),
            port,
            service: None,
            node: None,
        }
    }

    pub fn with_identity(mut self, service: Option<String>, node: Option<String>) -> Self {
        self.service = service;
        self.node = node;
        self
    }
}

impl PartialEq for RawDiscoveryRecord {
    fn eq(&self, other: &Self) -> bool {
        self.ip == other.ip && self.port == other.port
    }
}

impl Eq for RawDiscoveryRecord {}

impl Hash for RawDiscoveryRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ip.hash(state);
        self.port.hash(state);
    }
}

/// Normalized endpoint string: `ip:port` for IPv4, `[ip]:port` for IPv6.
///
/// Only [`crate::discovery::normalize`] builds these, so the host part is always a
/// parsed IP literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalEndpoint(String);

impl CanonicalEndpoint {
    pub(crate) fn from_parts(ip: IpAddr, port: i64) -> Self {
        match ip {
            IpAddr::V4(v4) => Self(format!("{}:{}", v4, port)),
            IpAddr::V6(v6) => Self(format!("[{}]:{}", v6, port)),
        }
    }

    /// Unchecked endpoint, for exercising resolver paths literals never reach.
    #[cfg(test)]
    pub(crate) fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into host (brackets stripped) and the raw port text.
    pub fn split_host_port(&self) -> Option<(&str, &str)> {
        let (host, port) = self.0.rsplit_once(':')?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        Some((host, port))
    }
}

impl fmt::Display for CanonicalEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalEndpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Connection-ready address handed to the cluster-formation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedAddress {
    /// Host portion of the endpoint this address was resolved from
    pub host: String,
    /// Resolved socket address
    pub socket: SocketAddr,
}

impl ResolvedAddress {
    pub fn new(host: impl Into<String>, socket: SocketAddr) -> Self {
        Self {
            host: host.into(),
            socket,
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.socket.ip()
    }

    pub fn port(&self) -> u16 {
        self.socket.port()
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket)
    }
}
