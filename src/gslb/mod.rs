// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Multi-cluster target resolution and traffic steering.
//!
//! This is the core of the controller. One call to [`build_dns_endpoint`] turns
//!
//! - the health of every managed host in this cluster,
//! - this cluster's ingress load-balancer status, and
//! - whatever peer clusters currently publish in DNS
//!
//! into the desired `DNSEndpoint` for one Gslb.
//!
//! # Flow
//!
//! 1. Every host is checked against the delegated zone ([`validate_hosts`])
//! 2. Local targets are resolved ([`local_targets`]); failure aborts
//! 3. Peer heartbeats the strategy depends on are checked ([`heartbeat`])
//! 4. Per host, concurrently: peers are asked for their targets ([`peers`]) and the
//!    strategy decides the answer ([`strategy`])
//! 5. Decisions are assembled into one object ([`endpoint`])
//!
//! Hosts are processed in sorted order and peers in configuration order, so the same
//! inputs always produce the same object.

pub mod endpoint;
pub mod heartbeat;
pub mod local_targets;
pub mod peers;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::{normalize_zone, ClusterTopology};
use crate::constants::{
    DEFAULT_DNS_TTL_SECS, DEFAULT_SPLIT_BRAIN_THRESHOLD_SECS, HEALTH_HEALTHY, HEALTH_UNHEALTHY,
};
use crate::crd::{DNSEndpoint, Gslb, StrategyType};
use crate::dns::DnsQuerier;
use crate::dns_errors::GslbError;
use crate::metrics;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use local_targets::IngressEndpoint;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use strategy::{HostDecision, HostInput, SplitBrainPolicy};
use tracing::{info, warn};

/// Health of a managed host in this cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => HEALTH_HEALTHY,
            Self::Unhealthy => HEALTH_UNHEALTHY,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health per managed host.
pub type HealthMap = BTreeMap<String, HealthStatus>;

/// Immutable view of one Gslb for the duration of a computation.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalService {
    pub name: String,
    pub namespace: String,
    /// Zone every managed host must belong to
    pub delegated_zone: String,
    pub strategy: StrategyType,
    pub primary_geo_tag: Option<String>,
    pub record_ttl: i64,
    pub split_brain_threshold: Duration,
    /// Controller reference attached to everything produced for this Gslb
    pub owner: Option<OwnerReference>,
}

impl GlobalService {
    /// Snapshot a Gslb, filling defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GslbError::MissingPrimaryGeoTag`] for a failover Gslb without a primary.
    pub fn from_gslb(gslb: &Gslb, topology: &ClusterTopology) -> Result<Self, GslbError> {
        let strategy = &gslb.spec.strategy;
        let primary_geo_tag = strategy
            .primary_geo_tag
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(ToString::to_string);

        if strategy.strategy_type == StrategyType::Failover && primary_geo_tag.is_none() {
            return Err(GslbError::MissingPrimaryGeoTag {
                gslb: gslb.name_any(),
            });
        }

        let threshold_secs = strategy
            .split_brain_threshold_seconds
            .unwrap_or(DEFAULT_SPLIT_BRAIN_THRESHOLD_SECS)
            .max(0);

        Ok(Self {
            name: gslb.name_any(),
            namespace: gslb.namespace().unwrap_or_default(),
            delegated_zone: topology.dns_zone.clone(),
            strategy: strategy.strategy_type,
            primary_geo_tag,
            record_ttl: strategy.dns_ttl_seconds.unwrap_or(DEFAULT_DNS_TTL_SECS),
            split_brain_threshold: Duration::from_secs(threshold_secs.unsigned_abs()),
            owner: gslb.controller_owner_ref(&()),
        })
    }

    /// Geo tag of the primary when `cluster_geo_tag` is a failover secondary.
    #[must_use]
    pub fn primary_peer(&self, cluster_geo_tag: &str) -> Option<&str> {
        match (self.strategy, self.primary_geo_tag.as_deref()) {
            (StrategyType::Failover, Some(primary)) if primary != cluster_geo_tag => Some(primary),
            _ => None,
        }
    }
}

/// Whether `host` is `zone` itself or a name below it (case and trailing-dot insensitive).
#[must_use]
pub fn is_in_zone(host: &str, zone: &str) -> bool {
    let host = normalize_zone(host);
    let zone = normalize_zone(zone);
    !zone.is_empty() && (host == zone || host.ends_with(&format!(".{zone}")))
}

/// Reject the whole set if any host lies outside the delegated zone.
///
/// # Errors
///
/// Returns [`GslbError::HostOutsideZone`] for the first offending host.
pub fn validate_hosts<'a>(
    hosts: impl IntoIterator<Item = &'a String>,
    zone: &str,
) -> Result<(), GslbError> {
    for host in hosts {
        if !is_in_zone(host, zone) {
            return Err(GslbError::HostOutsideZone {
                host: host.clone(),
                zone: zone.to_string(),
            });
        }
    }
    Ok(())
}

/// Compute the per-host decisions for one Gslb.
///
/// # Errors
///
/// Returns an error if a host is outside the delegated zone or the local targets
/// cannot be resolved. Peer failures never surface here.
pub async fn decide_hosts(
    service: &GlobalService,
    topology: &ClusterTopology,
    health: &HealthMap,
    ingress: &[IngressEndpoint],
    dns: &dyn DnsQuerier,
    now: DateTime<Utc>,
) -> Result<Vec<HostDecision>, GslbError> {
    validate_hosts(health.keys(), &service.delegated_zone)?;

    let local_targets = local_targets::resolve_local_targets(ingress, topology, dns).await?;
    let freshness = heartbeat::check_peers(service, topology, dns, now).await;
    let policy = SplitBrainPolicy::from_check(topology.split_brain_check);

    let per_host = health.iter().map(|(host, status)| {
        let local_targets = &local_targets;
        let freshness = &freshness;
        async move {
            let peers = peers::discover_peer_targets(host, topology, freshness, dns).await;
            if peers::external_targets(&peers).is_empty() {
                info!("No external targets have been found for host {}", host);
            }

            let input = HostInput {
                host,
                health: *status,
                local_targets,
                peers: &peers,
                freshness,
            };
            let decision = strategy::decide(&input, service, &topology.geo_tag, policy);

            if let Some(ambiguity) = &decision.ambiguity {
                match policy {
                    SplitBrainPolicy::Advisory => warn!(
                        gslb = %service.name,
                        host = %host,
                        "Failover on secondary without confirmation: {}", ambiguity
                    ),
                    SplitBrainPolicy::Enforced => warn!(
                        gslb = %service.name,
                        host = %host,
                        "Failover suppressed by split-brain check: {}", ambiguity
                    ),
                }
                metrics::record_failover_ambiguity(&service.name);
            }
            info!(
                "Final target list for {} Gslb host {}: {:?}",
                service.name, host, decision.final_targets
            );
            decision
        }
    });

    Ok(join_all(per_host).await)
}

/// Compute the desired `DNSEndpoint` for one Gslb.
///
/// # Errors
///
/// Same as [`decide_hosts`]; no object is produced on error.
pub async fn build_dns_endpoint(
    service: &GlobalService,
    topology: &ClusterTopology,
    health: &HealthMap,
    ingress: &[IngressEndpoint],
    dns: &dyn DnsQuerier,
    now: DateTime<Utc>,
) -> Result<DNSEndpoint, GslbError> {
    let decisions = decide_hosts(service, topology, health, ingress, dns, now).await?;
    Ok(endpoint::assemble(service, &decisions))
}
