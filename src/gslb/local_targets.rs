// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovery of the addresses this cluster serves a global host from.
//!
//! The load-balancer status of the local `Ingress` lists either bare IPs or hostnames
//! (cloud load balancers). Hostnames are resolved against the edge DNS server. Any
//! resolution failure is fatal: the cluster cannot describe its own endpoint.

use crate::config::ClusterTopology;
use crate::dns::{bounded, DnsQuerier};
use crate::dns_errors::GslbError;
use k8s_openapi::api::core::v1::LoadBalancerIngress;
use k8s_openapi::api::networking::v1::IngressLoadBalancerIngress;
use tracing::{debug, warn};

/// One load-balancer ingress entry: an IP, a hostname, or both.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IngressEndpoint {
    pub ip: Option<String>,
    pub hostname: Option<String>,
}

impl IngressEndpoint {
    /// Entry exposing a bare IP.
    #[must_use]
    pub fn ip(ip: &str) -> Self {
        Self {
            ip: Some(ip.to_string()),
            hostname: None,
        }
    }

    /// Entry exposing a hostname.
    #[must_use]
    pub fn hostname(hostname: &str) -> Self {
        Self {
            ip: None,
            hostname: Some(hostname.to_string()),
        }
    }
}

impl From<&IngressLoadBalancerIngress> for IngressEndpoint {
    fn from(entry: &IngressLoadBalancerIngress) -> Self {
        Self {
            ip: entry.ip.clone(),
            hostname: entry.hostname.clone(),
        }
    }
}

impl From<&LoadBalancerIngress> for IngressEndpoint {
    fn from(entry: &LoadBalancerIngress) -> Self {
        Self {
            ip: entry.ip.clone(),
            hostname: entry.hostname.clone(),
        }
    }
}

/// Resolve the ingress status into the list of local target IPs, in entry order.
///
/// An entry carrying both an IP and a hostname contributes both.
///
/// # Errors
///
/// Returns [`GslbError::LocalTargets`] if any hostname fails to resolve.
pub async fn resolve_local_targets(
    entries: &[IngressEndpoint],
    topology: &ClusterTopology,
    dns: &dyn DnsQuerier,
) -> Result<Vec<String>, GslbError> {
    let server = topology.edge_resolver();
    let mut targets = Vec::new();

    for entry in entries {
        if let Some(ip) = entry.ip.as_deref().filter(|ip| !ip.is_empty()) {
            targets.push(ip.to_string());
        }

        if let Some(hostname) = entry.hostname.as_deref().filter(|h| !h.is_empty()) {
            let ips = bounded(
                topology.query_timeout,
                &server,
                hostname,
                dns.query_a(&server, hostname),
            )
            .await
            .map_err(|source| {
                warn!("Can't resolve {} on {}: {}", hostname, server, source);
                GslbError::LocalTargets {
                    hostname: hostname.to_string(),
                    server: server.clone(),
                    source,
                }
            })?;
            debug!(hostname = %hostname, ?ips, "Resolved load balancer hostname");
            targets.extend(ips.iter().map(ToString::to_string));
        }
    }

    Ok(targets)
}

/// Addresses this cluster advertises as its delegated name server.
///
/// `entries` is the load-balancer status of the CoreDNS service named `service`.
///
/// # Errors
///
/// Returns [`GslbError::NoCoreDnsIngress`] if the service has no load-balancer entry
/// yet, or [`GslbError::LocalTargets`] if a hostname fails to resolve.
pub async fn coredns_exposed_ips(
    service: &str,
    entries: &[IngressEndpoint],
    topology: &ClusterTopology,
    dns: &dyn DnsQuerier,
) -> Result<Vec<String>, GslbError> {
    let ips = resolve_local_targets(entries, topology, dns).await?;
    if ips.is_empty() {
        return Err(GslbError::NoCoreDnsIngress {
            service: service.to_string(),
        });
    }
    Ok(ips)
}

#[cfg(test)]
#[path = "local_targets_tests.rs"]
mod local_targets_tests;
