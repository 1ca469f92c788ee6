// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovery of the targets peer clusters publish for a global host.
//!
//! Each peer serves `localtargets-<host>` from its own delegated name server
//! `gslb-ns-<dnsZone with dashes>-<geoTag>.<edgeDNSZone>`. Peers are queried
//! concurrently; a failing peer contributes nothing and never aborts discovery.
//! Results keep the configured peer order.

use super::heartbeat::{Freshness, PeerFreshness};
use crate::config::ClusterTopology;
use crate::constants::{LOCAL_TARGETS_PREFIX, NS_SERVER_PREFIX};
use crate::dns::{bounded, to_fqdn, DnsQuerier};
use crate::dns_errors::QueryError;
use crate::metrics;
use futures::future::join_all;
use tracing::{info, warn};

/// Outcome of asking one peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerState {
    /// The peer's name server answered (possibly with no targets)
    Answered,
    /// The query failed or timed out
    Unreachable(QueryError),
    /// Not queried because the peer's heartbeat is stale
    Skipped,
}

/// Targets contributed by one peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerTargets {
    pub geo_tag: String,
    pub name_server: String,
    pub targets: Vec<String>,
    pub state: PeerState,
}

/// Delegated name server of the cluster tagged `geo_tag`.
///
/// # Example
///
/// ```rust
/// use gslb::gslb::peers::ns_server_name;
///
/// assert_eq!(
///     ns_server_name("cloud.example.com", "eu", "example.com"),
///     "gslb-ns-cloud-example-com-eu.example.com"
/// );
/// ```
#[must_use]
pub fn ns_server_name(dns_zone: &str, geo_tag: &str, edge_dns_zone: &str) -> String {
    let zone_label = dns_zone.replace('.', "-");
    format!("{NS_SERVER_PREFIX}-{zone_label}-{geo_tag}.{edge_dns_zone}")
}

/// Name servers of every peer, paired with their geo tag, in configuration order.
#[must_use]
pub fn peer_ns_server_names(topology: &ClusterTopology) -> Vec<(String, String)> {
    topology
        .peer_geo_tags
        .iter()
        .map(|tag| {
            (
                tag.clone(),
                ns_server_name(&topology.dns_zone, tag, &topology.edge_dns_zone),
            )
        })
        .collect()
}

/// Name of the cluster-local record carrying a cluster's own targets for `host`.
#[must_use]
pub fn local_targets_name(host: &str) -> String {
    format!("{LOCAL_TARGETS_PREFIX}{host}")
}

/// Ask every peer for its `localtargets-<host>` record.
///
/// When the split-brain check is enforced, peers whose heartbeat is stale are skipped
/// without being queried.
pub async fn discover_peer_targets(
    host: &str,
    topology: &ClusterTopology,
    freshness: &PeerFreshness,
    dns: &dyn DnsQuerier,
) -> Vec<PeerTargets> {
    let query_name = to_fqdn(&local_targets_name(host));

    let lookups = peer_ns_server_names(topology)
        .into_iter()
        .map(|(geo_tag, name_server)| {
            let query_name = query_name.clone();
            async move {
                let stale = topology.split_brain_check
                    && freshness.get(&geo_tag).is_some_and(Freshness::is_stale);
                if stale {
                    warn!(
                        peer = %geo_tag,
                        "Skipping targets of {} for {}: heartbeat is stale", name_server, host
                    );
                    return PeerTargets {
                        geo_tag,
                        name_server,
                        targets: Vec::new(),
                        state: PeerState::Skipped,
                    };
                }

                let server = topology.resolver.select(&name_server);
                info!("Adding external Gslb targets from {} cluster...", name_server);
                let result = bounded(
                    topology.query_timeout,
                    &server,
                    &query_name,
                    dns.query_a(&server, &query_name),
                )
                .await;

                // NXDOMAIN: the peer serves no local targets for this host
                let result = match result {
                    Err(QueryError::NxDomain { .. }) => Ok(Vec::new()),
                    other => other,
                };

                match result {
                    Ok(ips) => {
                        let targets: Vec<String> = ips.iter().map(ToString::to_string).collect();
                        if !targets.is_empty() {
                            info!(
                                "Added external {:?} Gslb targets from {} cluster",
                                targets, name_server
                            );
                        }
                        PeerTargets {
                            geo_tag,
                            name_server,
                            targets,
                            state: PeerState::Answered,
                        }
                    }
                    Err(e) => {
                        warn!(
                            peer = %geo_tag,
                            "Error contacting external Gslb cluster ({}): {}", name_server, e
                        );
                        metrics::record_peer_query_failure(&geo_tag);
                        PeerTargets {
                            geo_tag,
                            name_server,
                            targets: Vec::new(),
                            state: PeerState::Unreachable(e),
                        }
                    }
                }
            }
        });

    join_all(lookups).await
}

/// Concatenate the targets of every answering peer, in peer order.
#[must_use]
pub fn external_targets(peers: &[PeerTargets]) -> Vec<String> {
    peers
        .iter()
        .filter(|peer| peer.state == PeerState::Answered)
        .flat_map(|peer| peer.targets.iter().cloned())
        .collect()
}

#[cfg(test)]
#[path = "peers_tests.rs"]
mod peers_tests;
