//! Structured Events
//!
//! One function per discovery event so field names stay consistent across
//! log lines.
//!
//! Event types:
//! - `round_started` - A discovery round began
//! - `records_fetched` - Registry query returned
//! - `registry_failed` - Registry query failed, round yields nothing
//! - `record_dropped` - A record failed normalization or resolution
//! - `round_completed` - A discovery round finished

use crate::registry::RegistryErrorKind;
use tracing::{debug, error};

/// Emit a round started event
pub fn round_started(service_count: usize, tag: Option<&str>, healthy_only: bool) {
    debug!(
        event_type = "round_started",
        service_count = service_count,
        tag = ?tag,
        healthy_only = healthy_only,
        "Starting discovery request"
    );
}

/// Emit a records fetched event
pub fn records_fetched(raw_count: usize, distinct_count: usize, elapsed_ms: u128) {
    debug!(
        event_type = "records_fetched",
        raw_count = raw_count,
        distinct_count = distinct_count,
        elapsed_ms = elapsed_ms as u64,
        "Discovered {} nodes in {} ms",
        distinct_count,
        elapsed_ms
    );
}

/// Emit a registry failed event
pub fn registry_failed(kind: RegistryErrorKind, error: &dyn std::error::Error) {
    let reason = match kind {
        RegistryErrorKind::Io => "failed in making consul based discovery",
        RegistryErrorKind::Privilege => "due to security privileges",
    };
    error!(
        event_type = "registry_failed",
        kind = ?kind,
        error = %error,
        "Failed to discover nodes, {}",
        reason
    );
}

/// Emit a record dropped event
pub fn record_dropped(ip: &str, port: i64, stage: &str) {
    debug!(
        event_type = "record_dropped",
        ip = %ip,
        port = port,
        stage = %stage,
        "Dropped discovery record"
    );
}

/// Emit a round completed event
pub fn round_completed(addresses: &[String], dropped: usize, elapsed_ms: u128) {
    debug!(
        event_type = "round_completed",
        address_count = addresses.len(),
        dropped = dropped,
        elapsed_ms = elapsed_ms as u64,
        "Using Consul based dynamic discovery nodes {:?}",
        addresses
    );
}
