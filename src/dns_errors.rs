// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS query, heartbeat, and target-resolution error types.
//!
//! This module provides specialized error types for:
//! - Outbound DNS queries issued through a [`crate::dns::DnsQuerier`]
//! - Heartbeat (split-brain) validation of peer clusters
//! - Fatal conditions of the target-resolution engine
//!
//! The split matters to callers: a [`QueryError`] against a peer is tolerated,
//! a [`HeartbeatError`] marks peer data as untrustworthy, and a [`GslbError`]
//! aborts the current reconcile.

use thiserror::Error;

/// Errors that can occur while issuing a single DNS query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The queried name is not a valid DNS name
    #[error("Invalid DNS name '{name}': {reason}")]
    InvalidName {
        /// The name that failed to parse
        name: String,
        /// Parser message
        reason: String,
    },

    /// The resolver address could not be turned into a socket address
    #[error("Invalid DNS server address '{server}': {reason}")]
    InvalidServer {
        /// The resolver address as configured
        server: String,
        /// Why it could not be used
        reason: String,
    },

    /// No response within the per-query timeout
    #[error("DNS query for '{name}' to {server} timed out after {timeout_ms}ms")]
    Timeout {
        /// The queried name
        name: String,
        /// The resolver that did not answer
        server: String,
        /// The timeout that elapsed
        timeout_ms: u64,
    },

    /// Socket or protocol failure talking to the resolver
    #[error("DNS query for '{name}' to {server} failed: {reason}")]
    Transport {
        /// The queried name
        name: String,
        /// The resolver that failed
        server: String,
        /// Underlying client error
        reason: String,
    },

    /// The resolver answered NXDOMAIN
    #[error("DNS name '{name}' does not exist on {server} (NXDOMAIN)")]
    NxDomain {
        /// The queried name
        name: String,
        /// The resolver that answered
        server: String,
    },

    /// The resolver answered with any other non-success response code
    #[error("DNS server {server} answered {response_code} for '{name}'")]
    ServerFailure {
        /// The queried name
        name: String,
        /// The resolver that answered
        server: String,
        /// Response code as text (e.g. `SERVFAIL`, `REFUSED`)
        response_code: String,
    },
}

/// Reasons a peer heartbeat is considered gone or stale.
///
/// Every variant means the peer's published state must not be trusted for
/// the current reconcile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatError {
    /// The edge DNS server could not be queried
    #[error("Heartbeat '{fqdn}' unreachable on edge DNS server {server}: {source}")]
    Unreachable {
        /// Heartbeat record name
        fqdn: String,
        /// Edge DNS server queried
        server: String,
        /// Query failure
        #[source]
        source: QueryError,
    },

    /// The query succeeded but no TXT answer was present
    #[error("Can't find heartbeat TXT record '{fqdn}' on edge DNS server {server}")]
    Missing {
        /// Heartbeat record name
        fqdn: String,
        /// Edge DNS server queried
        server: String,
    },

    /// The TXT payload is not a `YYYY-MM-DDTHH:MM:SS` timestamp
    #[error("Heartbeat '{fqdn}' carries unparsable timestamp '{value}'")]
    Malformed {
        /// Heartbeat record name
        fqdn: String,
        /// Raw TXT payload
        value: String,
    },

    /// The timestamp is older than the split-brain threshold
    #[error("Heartbeat '{fqdn}' expired: age {age_secs}s exceeds threshold {threshold_secs}s")]
    Expired {
        /// Heartbeat record name
        fqdn: String,
        /// Observed age in seconds
        age_secs: i64,
        /// Configured threshold in seconds
        threshold_secs: i64,
    },
}

impl HeartbeatError {
    /// Short, metric-safe label for the failure mode.
    #[must_use]
    pub fn verdict(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "unreachable",
            Self::Missing { .. } => "missing",
            Self::Malformed { .. } => "malformed",
            Self::Expired { .. } => "expired",
        }
    }
}

/// Fatal errors of the target-resolution engine.
///
/// Any of these aborts the reconcile; the controller retries with its standard requeue.
#[derive(Error, Debug)]
pub enum GslbError {
    /// A managed host is not inside the delegated zone
    #[error("Ingress host {host} does not match delegated zone {zone}")]
    HostOutsideZone {
        /// The offending host
        host: String,
        /// The delegated zone
        zone: String,
    },

    /// This cluster's own targets could not be resolved
    #[error("Can't resolve local target hostname {hostname} on {server}: {source}")]
    LocalTargets {
        /// Load-balancer hostname that failed to resolve
        hostname: String,
        /// Edge DNS server used
        server: String,
        /// Query failure
        #[source]
        source: QueryError,
    },

    /// A failover strategy without a primary geo tag
    #[error("Gslb {gslb} uses the failover strategy but has no primaryGeoTag")]
    MissingPrimaryGeoTag {
        /// Gslb name
        gslb: String,
    },

    /// The configured edge DNS type is not one of the known providers
    #[error("Unhandled edge DNS type '{0}' (expected one of: route53, ns1, infoblox, none)")]
    UnknownEdgeDnsType(String),

    /// The `CoreDNS` load-balancer service exposes no ingress entries
    #[error("No load balancer ingress entries found for service {service}")]
    NoCoreDnsIngress {
        /// Service name
        service: String,
    },
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
