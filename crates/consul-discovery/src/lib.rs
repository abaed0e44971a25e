//! Consul Discovery Library
//!
//! Finds cluster peers by querying Consul for healthy service instances and
//! turning each entry into a validated, deduplicated socket address.

pub mod config;
pub mod discovery;
pub mod observability;
pub mod registry;

use std::sync::Arc;

pub use config::{ConfigError, DiscoveryConfig};
pub use discovery::{DiscoveryOrchestrator, DiscoveryQuery, ResolvedAddress};

/// Wire the Consul registry and DNS resolver into an orchestrator.
pub fn consul_orchestrator(
    config: &DiscoveryConfig,
) -> Result<DiscoveryOrchestrator, registry::RegistryError> {
    let registry = registry::ConsulRegistry::new(config)?;
    let resolver = discovery::DnsAddressResolver::new(config.resolve_timeout);
    Ok(DiscoveryOrchestrator::new(
        DiscoveryQuery::from(config),
        Arc::new(registry),
        Arc::new(resolver),
    ))
}
