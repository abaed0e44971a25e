//! Discovery Configuration
//!
//! Static settings for the registry connection and the discovery round, with
//! environment variable overrides. Loaded once and treated as read-only.

use std::collections::BTreeSet;
use std::net::Ipv6Addr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("registry host must not be empty")]
    EmptyHost,
    #[error("registry port must not be 0")]
    ZeroPort,
    #[error("{0} must not be 0")]
    ZeroTimeout(&'static str),
}

/// Discovery configuration with sensible defaults
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryConfig {
    // Registry connection
    /// Consul agent host (env: CONSUL_HOST)
    pub registry_host: String,

    /// Consul agent HTTP port (env: CONSUL_PORT)
    pub registry_port: u16,

    /// ACL token sent with every query (env: CONSUL_TOKEN)
    pub token: Option<String>,

    /// Timeout for a single registry request
    pub request_timeout: Duration,

    // Query filters
    /// Services whose instances are cluster members (env: CONSUL_SERVICE_NAMES, comma-separated)
    pub service_names: BTreeSet<String>,

    /// Only instances carrying this tag (env: CONSUL_TAG)
    pub tag: Option<String>,

    /// Only instances whose checks are passing (env: CONSUL_HEALTHY)
    pub healthy_only: bool,

    // Resolution
    /// Timeout for a single endpoint lookup
    pub resolve_timeout: Duration,

    // Scheduling
    /// Interval between rounds in watch mode
    pub discovery_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            registry_host: "localhost".to_string(),
            registry_port: 8500,
            token: None,
            request_timeout: Duration::from_secs(5),

            service_names: BTreeSet::new(),
            tag: None,
            healthy_only: true,

            resolve_timeout: Duration::from_secs(5),

            discovery_interval: Duration::from_secs(30),
        }
    }
}

impl DiscoveryConfig {
    /// Create configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(host) = lookup("CONSUL_HOST") {
            config.registry_host = host;
        }

        if let Some(port) = parse_var::<u16>(&lookup, "CONSUL_PORT") {
            config.registry_port = port;
        }

        if let Some(token) = lookup("CONSUL_TOKEN").filter(|t| !t.is_empty()) {
            config.token = Some(token);
        }

        if let Some(names) = lookup("CONSUL_SERVICE_NAMES") {
            config.service_names = split_list(&names);
        }

        if let Some(tag) = lookup("CONSUL_TAG").filter(|t| !t.is_empty()) {
            config.tag = Some(tag);
        }

        if let Some(healthy) = parse_var::<bool>(&lookup, "CONSUL_HEALTHY") {
            config.healthy_only = healthy;
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "CONSUL_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "CONSUL_RESOLVE_TIMEOUT_SECS") {
            config.resolve_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<u64>(&lookup, "DISCOVERY_INTERVAL_SECS") {
            config.discovery_interval = Duration::from_secs(secs);
        }

        config
    }

    /// Base URL of the Consul HTTP API
    ///
    /// Bare IPv6 hosts are bracketed; hosts already in `[..]` form are kept.
    pub fn registry_url(&self) -> String {
        let host = self.registry_host.trim();
        if host.parse::<Ipv6Addr>().is_ok() {
            format!("http://[{}]:{}", host, self.registry_port)
        } else {
            format!("http://{}:{}", host, self.registry_port)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.registry_port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("request timeout"));
        }
        if self.resolve_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout("resolve timeout"));
        }
        if self.service_names.is_empty() {
            warn!("No service names configured, discovery rounds will find no peers");
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}

/// Split a comma-separated list, dropping blanks
pub fn split_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
