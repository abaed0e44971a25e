//! Discovery Orchestrator
//!
//! Runs one discovery round: query the registry, deduplicate, normalize,
//! resolve. Every failure is absorbed; a round always yields a (possibly
//! empty) address list.

use super::normalize::normalize;
use super::record::{RawDiscoveryRecord, ResolvedAddress};
use super::resolve::{resolve_endpoint, AddressResolver};
use crate::config::DiscoveryConfig;
use crate::observability::events;
use crate::registry::RegistryQuery;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// What to ask the registry for. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryQuery {
    pub service_names: BTreeSet<String>,
    pub tag: Option<String>,
    pub healthy_only: bool,
}

impl From<&DiscoveryConfig> for DiscoveryQuery {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            service_names: config.service_names.clone(),
            tag: config.tag.clone(),
            healthy_only: config.healthy_only,
        }
    }
}

/// Drives discovery rounds against a registry and a transport resolver.
///
/// Holds no mutable state, so concurrent rounds are independent.
#[derive(Clone)]
pub struct DiscoveryOrchestrator {
    query: DiscoveryQuery,
    registry: Arc<dyn RegistryQuery>,
    resolver: Arc<dyn AddressResolver>,
}

impl DiscoveryOrchestrator {
    pub fn new(
        query: DiscoveryQuery,
        registry: Arc<dyn RegistryQuery>,
        resolver: Arc<dyn AddressResolver>,
    ) -> Self {
        Self {
            query,
            registry,
            resolver,
        }
    }

    /// Run one round and return the resolved peer addresses.
    #[instrument(skip(self), fields(services = ?self.query.service_names))]
    pub async fn discover(&self) -> Vec<ResolvedAddress> {
        let started = Instant::now();
        let records = self.fetch_records(started).await;

        let mut addresses = Vec::with_capacity(records.len());
        let mut seen = HashSet::with_capacity(records.len());
        let mut dropped = 0;

        for record in &records {
            let Some(endpoint) = normalize(record) else {
                events::record_dropped(&record.ip, record.port, "normalize");
                dropped += 1;
                continue;
            };

            // Spellings like "::ffff:10.0.0.1" only collapse after normalization
            if !seen.insert(endpoint.clone()) {
                debug!(endpoint = %endpoint, ip = %record.ip, "Skipping repeated endpoint");
                continue;
            }

            match resolve_endpoint(self.resolver.as_ref(), &endpoint).await {
                Some(address) => addresses.push(address),
                None => {
                    events::record_dropped(&record.ip, record.port, "resolve");
                    dropped += 1;
                }
            }
        }

        let rendered: Vec<String> = addresses.iter().map(ToString::to_string).collect();
        events::round_completed(&rendered, dropped, started.elapsed().as_millis());

        addresses
    }

    /// Query the registry and collapse duplicates, keeping first-seen order.
    ///
    /// Registry failures yield an empty list.
    async fn fetch_records(&self, started: Instant) -> Vec<RawDiscoveryRecord> {
        events::round_started(
            self.query.service_names.len(),
            self.query.tag.as_deref(),
            self.query.healthy_only,
        );

        match self
            .registry
            .query_instances(
                &self.query.service_names,
                self.query.tag.as_deref(),
                self.query.healthy_only,
            )
            .await
        {
            Ok(records) => {
                let raw_count = records.len();
                let distinct = dedup(records);
                events::records_fetched(raw_count, distinct.len(), started.elapsed().as_millis());
                distinct
            }
            Err(e) => {
                events::registry_failed(e.kind(), &e);
                Vec::new()
            }
        }
    }
}

/// Set semantics on `(ip, port)`; the first occurrence of each record wins.
///
/// Compares the registry's raw strings. Records that spell the same address
/// differently survive here and are collapsed by `discover` once normalized.
pub fn dedup(records: Vec<RawDiscoveryRecord>) -> Vec<RawDiscoveryRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::record::CanonicalEndpoint;
    use crate::discovery::resolve::{DnsAddressResolver, ResolveError};
    use crate::registry::RegistryError;
    use async_trait::async_trait;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns a fixed record batch, or a fixed failure
    struct FakeRegistry {
        result: Mutex<Option<Result<Vec<RawDiscoveryRecord>, RegistryError>>>,
        calls: Mutex<Vec<(BTreeSet<String>, Option<String>, bool)>>,
    }

    impl FakeRegistry {
        fn returning(records: Vec<RawDiscoveryRecord>) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(Ok(records))),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: RegistryError) -> Arc<Self> {
            Arc::new(Self {
                result: Mutex::new(Some(Err(error))),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RegistryQuery for FakeRegistry {
        async fn query_instances(
            &self,
            service_names: &BTreeSet<String>,
            tag: Option<&str>,
            healthy_only: bool,
        ) -> Result<Vec<RawDiscoveryRecord>, RegistryError> {
            self.calls.lock().unwrap().push((
                service_names.clone(),
                tag.map(String::from),
                healthy_only,
            ));
            self.result.lock().unwrap().take().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Rejects one configured endpoint, resolves everything else as a literal
    struct RejectingResolver {
        reject: String,
        inner: DnsAddressResolver,
    }

    #[async_trait]
    impl AddressResolver for RejectingResolver {
        async fn resolve(
            &self,
            endpoint: &CanonicalEndpoint,
        ) -> Result<ResolvedAddress, ResolveError> {
            if endpoint.as_str() == self.reject {
                return Err(ResolveError::NoAddresses(endpoint.to_string()));
            }
            self.inner.resolve(endpoint).await
        }
    }

    fn query() -> DiscoveryQuery {
        DiscoveryQuery {
            service_names: ["elasticsearch".to_string()].into_iter().collect(),
            tag: Some("prod".to_string()),
            healthy_only: true,
        }
    }

    fn dns() -> Arc<dyn AddressResolver> {
        Arc::new(DnsAddressResolver::new(Duration::from_secs(1)))
    }

    fn rendered(addresses: &[ResolvedAddress]) -> Vec<String> {
        addresses.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let records = vec![
            RawDiscoveryRecord::new("10.0.0.2", 7),
            RawDiscoveryRecord::new("10.0.0.1", 7),
            RawDiscoveryRecord::new("10.0.0.2", 7),
        ];
        let distinct = dedup(records);
        assert_eq!(distinct.len(), 2);
        assert_eq!(distinct[0].ip, "10.0.0.2");
        assert_eq!(distinct[1].ip, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_duplicates_resolve_once() {
        let registry = FakeRegistry::returning(vec![
            RawDiscoveryRecord::new("10.0.0.1", 7),
            RawDiscoveryRecord::new("10.0.0.1", 7),
            RawDiscoveryRecord::new("10.0.0.2", 7),
        ]);
        let orchestrator = DiscoveryOrchestrator::new(query(), registry, dns());

        let addresses = orchestrator.discover().await;
        assert_eq!(rendered(&addresses), vec!["10.0.0.1:7", "10.0.0.2:7"]);
    }

    #[tokio::test]
    async fn test_equivalent_spellings_resolve_once() {
        let registry = FakeRegistry::returning(vec![
            RawDiscoveryRecord::new("10.0.0.1", 7),
            RawDiscoveryRecord::new("::ffff:10.0.0.1", 7),
            RawDiscoveryRecord::new("2001:DB8::1", 7),
            RawDiscoveryRecord::new("2001:db8::1", 7),
            RawDiscoveryRecord::new("2001:db8::1", 8),
        ]);
        let orchestrator = DiscoveryOrchestrator::new(query(), registry, dns());

        let addresses = orchestrator.discover().await;
        assert_eq!(
            rendered(&addresses),
            vec!["10.0.0.1:7", "[2001:db8::1]:7", "[2001:db8::1]:8"]
        );
    }

    #[tokio::test]
    async fn test_malformed_record_is_dropped() {
        let registry = FakeRegistry::returning(vec![
            RawDiscoveryRecord::new("192.168.1.1", 8080),
            RawDiscoveryRecord::new("wrong address", 8080),
            RawDiscoveryRecord::new("192.168.1", 8080),
            RawDiscoveryRecord::new("2001:1db8:85a3:1234:1234:8a2e:1370:7334", 8080),
        ]);
        let orchestrator = DiscoveryOrchestrator::new(query(), registry, dns());

        let addresses = orchestrator.discover().await;
        assert_eq!(
            rendered(&addresses),
            vec![
                "192.168.1.1:8080",
                "[2001:1db8:85a3:1234:1234:8a2e:1370:7334]:8080"
            ]
        );
        assert_eq!(addresses[0].host, "192.168.1.1");
        assert_eq!(addresses[0].port(), 8080);
    }

    #[tokio::test]
    async fn test_resolution_failure_is_isolated() {
        let registry = FakeRegistry::returning(vec![
            RawDiscoveryRecord::new("10.0.0.1", 9300),
            RawDiscoveryRecord::new("10.0.0.2", 9300),
            RawDiscoveryRecord::new("10.0.0.3", 9300),
        ]);
        let resolver = Arc::new(RejectingResolver {
            reject: "10.0.0.2:9300".to_string(),
            inner: DnsAddressResolver::new(Duration::from_secs(1)),
        });
        let orchestrator = DiscoveryOrchestrator::new(query(), registry, resolver);

        let addresses = orchestrator.discover().await;
        assert_eq!(rendered(&addresses), vec!["10.0.0.1:9300", "10.0.0.3:9300"]);
    }

    #[tokio::test]
    async fn test_out_of_range_port_is_dropped() {
        let registry = FakeRegistry::returning(vec![
            RawDiscoveryRecord::new("10.0.0.1", 70000),
            RawDiscoveryRecord::new("10.0.0.2", 9300),
        ]);
        let orchestrator = DiscoveryOrchestrator::new(query(), registry, dns());

        let addresses = orchestrator.discover().await;
        assert_eq!(rendered(&addresses), vec!["10.0.0.2:9300"]);
    }

    #[tokio::test]
    async fn test_registry_io_failure_yields_empty() {
        let registry = FakeRegistry::failing(RegistryError::from(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        )));
        let orchestrator = DiscoveryOrchestrator::new(query(), registry, dns());

        assert!(orchestrator.discover().await.is_empty());
    }

    #[tokio::test]
    async fn test_registry_privilege_failure_yields_empty() {
        let registry = FakeRegistry::failing(RegistryError::Unauthorized {
            service: "elasticsearch".to_string(),
            status: reqwest::StatusCode::FORBIDDEN,
        });
        let orchestrator = DiscoveryOrchestrator::new(query(), registry, dns());

        assert!(orchestrator.discover().await.is_empty());
    }

    #[tokio::test]
    async fn test_query_is_passed_through() {
        let registry = FakeRegistry::returning(Vec::new());
        let orchestrator = DiscoveryOrchestrator::new(query(), registry.clone(), dns());

        orchestrator.discover().await;

        let calls = registry.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("elasticsearch"));
        assert_eq!(calls[0].1.as_deref(), Some("prod"));
        assert!(calls[0].2);
    }

    #[test]
    fn test_query_from_config() {
        let config = DiscoveryConfig {
            service_names: ["a".to_string(), "b".to_string()].into_iter().collect(),
            tag: None,
            healthy_only: false,
            ..Default::default()
        };
        let query = DiscoveryQuery::from(&config);
        assert_eq!(query.service_names.len(), 2);
        assert!(query.tag.is_none());
        assert!(!query.healthy_only);
    }
}
