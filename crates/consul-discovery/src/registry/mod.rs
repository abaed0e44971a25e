//! Service Registry
//!
//! Capability boundary for querying the registry, plus the Consul HTTP
//! implementation and its response model.

mod consul;
mod health;

pub use consul::ConsulRegistry;
pub use health::{HealthCheck, HealthEntry, HealthNode, HealthService};

use crate::discovery::RawDiscoveryRecord;
use async_trait::async_trait;
use std::collections::BTreeSet;
use thiserror::Error;

/// Coarse classification used when a round degrades to an empty result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    /// Registry unreachable, timed out, or returned an unusable response
    Io,
    /// Registry refused the request (ACL)
    Privilege,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid registry URL '{0}'")]
    InvalidUrl(String),
    #[error("request for service '{service}' failed: {source}")]
    Request {
        service: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("registry returned HTTP {status} for service '{service}'")]
    Status {
        service: String,
        status: reqwest::StatusCode,
    },
    #[error("registry denied access to service '{service}' (HTTP {status})")]
    Unauthorized {
        service: String,
        status: reqwest::StatusCode,
    },
    #[error("invalid health response for service '{service}': {source}")]
    Decode {
        service: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RegistryError {
    pub fn kind(&self) -> RegistryErrorKind {
        match self {
            RegistryError::Unauthorized { .. } => RegistryErrorKind::Privilege,
            RegistryError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                RegistryErrorKind::Privilege
            }
            _ => RegistryErrorKind::Io,
        }
    }
}

/// Query for instances of a set of services.
#[async_trait]
pub trait RegistryQuery: Send + Sync {
    /// Fetch raw records for every name in `service_names`.
    ///
    /// The result may contain the same `(ip, port)` more than once.
    async fn query_instances(
        &self,
        service_names: &BTreeSet<String>,
        tag: Option<&str>,
        healthy_only: bool,
    ) -> Result<Vec<RawDiscoveryRecord>, RegistryError>;
}
