//! Endpoint Resolution
//!
//! Converts canonical endpoints into socket addresses through an
//! [`AddressResolver`]. Failures are isolated per endpoint.

use super::record::{CanonicalEndpoint, ResolvedAddress};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("malformed endpoint '{0}'")]
    Malformed(String),
    #[error("invalid port '{port}' in endpoint '{endpoint}'")]
    InvalidPort { endpoint: String, port: String },
    #[error("lookup of '{endpoint}' failed: {source}")]
    Lookup {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("lookup of '{endpoint}' timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    #[error("lookup of '{0}' returned no addresses")]
    NoAddresses(String),
}

/// Transport-side facility that turns an endpoint string into a connectable address.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Make a single resolution attempt. Implementations must not retry.
    async fn resolve(&self, endpoint: &CanonicalEndpoint) -> Result<ResolvedAddress, ResolveError>;
}

/// Resolver backed by the tokio DNS facility.
///
/// IP literals are converted directly. Anything else gets one `lookup_host`
/// call bounded by `timeout`, and the first returned address is used.
#[derive(Debug, Clone)]
pub struct DnsAddressResolver {
    timeout: Duration,
}

impl DnsAddressResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl AddressResolver for DnsAddressResolver {
    async fn resolve(&self, endpoint: &CanonicalEndpoint) -> Result<ResolvedAddress, ResolveError> {
        let (host, port_str) = endpoint
            .split_host_port()
            .ok_or_else(|| ResolveError::Malformed(endpoint.to_string()))?;

        let port: u16 = port_str.parse().map_err(|_| ResolveError::InvalidPort {
            endpoint: endpoint.to_string(),
            port: port_str.to_string(),
        })?;

        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ResolvedAddress::new(host, (ip, port).into()));
        }

        let lookup = tokio::net::lookup_host((host, port));
        let mut addrs = match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(addrs)) => addrs,
            Ok(Err(e)) => {
                return Err(ResolveError::Lookup {
                    endpoint: endpoint.to_string(),
                    source: e,
                })
            }
            Err(_) => {
                return Err(ResolveError::Timeout {
                    endpoint: endpoint.to_string(),
                    timeout: self.timeout,
                })
            }
        };

        addrs
            .next()
            .map(|socket| ResolvedAddress::new(host, socket))
            .ok_or_else(|| ResolveError::NoAddresses(endpoint.to_string()))
    }
}

/// Resolve one endpoint, logging and swallowing failures.
pub async fn resolve_endpoint(
    resolver: &dyn AddressResolver,
    endpoint: &CanonicalEndpoint,
) -> Option<ResolvedAddress> {
    match resolver.resolve(endpoint).await {
        Ok(address) => {
            debug!(
                address = %address,
                endpoint = %endpoint,
                "Created transport address"
            );
            Some(address)
        }
        Err(e) => {
            warn!(endpoint = %endpoint, error = %e, "Failed to add address");
            None
        }
    }
}
