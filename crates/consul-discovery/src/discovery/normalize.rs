//! Address Normalization
//!
//! Turns a raw registry record into a [`CanonicalEndpoint`]. Only numeric IP
//! literals are accepted; hostnames and partial addresses are rejected.

use super::record::{CanonicalEndpoint, RawDiscoveryRecord};
use std::net::IpAddr;
use thiserror::Error;
use tracing::error;

/// Reasons a registry host cannot be turned into an endpoint
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")]
    Empty,
    #[error("'{0}' is not an IP string literal")]
    NotIpLiteral(String),
}

/// Parse `ip` and render the canonical endpoint, returning the failure reason.
pub fn try_normalize(record: &RawDiscoveryRecord) -> Result<CanonicalEndpoint, AddressError> {
    let raw = record.ip.as_str();
    if raw.is_empty() {
        return Err(AddressError::Empty);
    }

    let ip: IpAddr = raw
        .parse()
        .map_err(|_| AddressError::NotIpLiteral(raw.to_string()))?;

    // Mapped addresses connect over IPv4
    let ip = match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    };

    Ok(CanonicalEndpoint::from_parts(ip, record.port))
}

/// Normalize a record, logging and swallowing failures.
pub fn normalize(record: &RawDiscoveryRecord) -> Option<CanonicalEndpoint> {
    match try_normalize(record) {
        Ok(endpoint) => Some(endpoint),
        Err(e) => {
            error!(
                ip = %record.ip,
                port = record.port,
                service = ?record.service,
                error = %e,
                "Can't convert {}:{} to proper address string",
                record.ip,
                record.port
            );
            None
        }
    }
}
