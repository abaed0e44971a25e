//! Consul HTTP registry client

use super::health::HealthEntry;
use super::{RegistryError, RegistryQuery};
use crate::config::DiscoveryConfig;
use crate::discovery::RawDiscoveryRecord;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use std::collections::BTreeSet;
use tracing::{debug, trace};

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Queries Consul's health endpoint for each configured service name
#[derive(Debug, Clone)]
pub struct ConsulRegistry {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ConsulRegistry {
    pub fn new(config: &DiscoveryConfig) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(RegistryError::Client)?;

        let registry_url = config.registry_url();
        let base_url = Url::parse(&registry_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(RegistryError::InvalidUrl(registry_url))?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the health request for one service.
    fn health_request(&self, service: &str, tag: Option<&str>, healthy_only: bool) -> RequestBuilder {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v1", "health", "service", service]);
        }

        let mut request = self.client.get(url);

        if healthy_only {
            request = request.query(&[("passing", "true")]);
        }
        if let Some(tag) = tag {
            request = request.query(&[("tag", tag)]);
        }
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        request
    }

    async fn fetch_service(
        &self,
        service: &str,
        tag: Option<&str>,
        healthy_only: bool,
    ) -> Result<Vec<HealthEntry>, RegistryError> {
        debug!(service = %service, tag = ?tag, healthy_only, "Querying registry health endpoint");

        let response = self
            .health_request(service, tag, healthy_only)
            .send()
            .await
            .map_err(|e| RegistryError::Request {
                service: service.to_string(),
                source: e,
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RegistryError::Unauthorized {
                service: service.to_string(),
                status,
            });
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                service: service.to_string(),
                status,
            });
        }

        response
            .json::<Vec<HealthEntry>>()
            .await
            .map_err(|e| RegistryError::Decode {
                service: service.to_string(),
                source: e,
            })
    }
}

#[async_trait]
impl RegistryQuery for ConsulRegistry {
    async fn query_instances(
        &self,
        service_names: &BTreeSet<String>,
        tag: Option<&str>,
        healthy_only: bool,
    ) -> Result<Vec<RawDiscoveryRecord>, RegistryError> {
        let mut records = Vec::new();

        for service in service_names {
            let entries = self.fetch_service(service, tag, healthy_only).await?;
            debug!(service = %service, entries = entries.len(), "Registry returned entries");

            for entry in &entries {
                trace!(
                    service_id = %entry.service.id,
                    node = %entry.node.node,
                    address = %entry.address(),
                    port = entry.service.port,
                    passing = entry.is_passing(),
                    "Health entry"
                );
                records.push(entry.to_record());
            }
        }

        Ok(records)
    }
}
