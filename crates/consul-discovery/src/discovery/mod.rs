//! Discovery Pipeline
//!
//! Turns registry entries into connectable peer addresses:
//! 1. Query: fetch raw records from the registry
//! 2. Deduplicate: collapse records with the same `(ip, port)`
//! 3. Normalize: render `ip:port` / `[ip]:port`, dropping malformed hosts
//! 4. Resolve: hand the endpoint to the transport resolver, dropping failures

mod normalize;
mod orchestrator;
mod record;
mod resolve;

pub use normalize::{normalize, try_normalize, AddressError};
pub use orchestrator::{dedup, DiscoveryOrchestrator, DiscoveryQuery};
pub use record::{CanonicalEndpoint, RawDiscoveryRecord, ResolvedAddress};
pub use resolve::{resolve_endpoint, AddressResolver, DnsAddressResolver, ResolveError};
