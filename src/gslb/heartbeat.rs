// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Split-brain guard based on peer heartbeat TXT records.
//!
//! Every cluster publishes `<gslb>-heartbeat-<geoTag>.<edgeDNSZone>` at the edge DNS
//! server with the current UTC time as `YYYY-MM-DDTHH:MM:SS`. Before a peer's
//! published state is trusted, its heartbeat is read back and must be no older than
//! the Gslb's split-brain threshold. A heartbeat exactly at the threshold is still
//! fresh; anything strictly older is stale.

use super::GlobalService;
use crate::config::ClusterTopology;
use crate::constants::HEARTBEAT_TIMESTAMP_FORMAT;
use crate::dns::{bounded, DnsQuerier};
use crate::dns_errors::{HeartbeatError, QueryError};
use crate::metrics;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Heartbeat verdict for one peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// Heartbeat present and within the threshold
    Fresh,
    /// Heartbeat gone or too old
    Stale(HeartbeatError),
    /// Heartbeat was not consulted this cycle
    Unchecked,
}

impl Freshness {
    /// Whether the peer's data may be used when the guard is enforced.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Freshness per peer geo tag.
pub type PeerFreshness = BTreeMap<String, Freshness>;

/// Heartbeat record name of `geo_tag` for the Gslb `gslb_name`.
///
/// # Example
///
/// ```rust
/// use gslb::gslb::heartbeat::heartbeat_fqdn;
///
/// assert_eq!(heartbeat_fqdn("app", "eu", "example.com"), "app-heartbeat-eu.example.com");
/// ```
#[must_use]
pub fn heartbeat_fqdn(gslb_name: &str, geo_tag: &str, edge_dns_zone: &str) -> String {
    format!("{gslb_name}-heartbeat-{geo_tag}.{edge_dns_zone}")
}

/// Heartbeat record names of every peer, in configuration order.
#[must_use]
pub fn peer_heartbeat_fqdns(gslb_name: &str, topology: &ClusterTopology) -> Vec<(String, String)> {
    topology
        .peer_geo_tags
        .iter()
        .map(|tag| {
            (
                tag.clone(),
                heartbeat_fqdn(gslb_name, tag, &topology.edge_dns_zone),
            )
        })
        .collect()
}

/// TXT payload this cluster publishes as its heartbeat.
#[must_use]
pub fn format_heartbeat(now: DateTime<Utc>) -> String {
    now.format(HEARTBEAT_TIMESTAMP_FORMAT).to_string()
}

/// Validate the heartbeat stored at `fqdn` on the edge resolver `server`.
///
/// # Errors
///
/// Returns a distinct [`HeartbeatError`] when the edge server cannot be queried, no
/// TXT answer is present (including NXDOMAIN), the timestamp cannot be parsed, or it is older than
/// `threshold` relative to `now`.
pub async fn check_alive(
    dns: &dyn DnsQuerier,
    server: &str,
    fqdn: &str,
    threshold: Duration,
    query_timeout: Duration,
    now: DateTime<Utc>,
) -> Result<(), HeartbeatError> {
    let answers = match bounded(query_timeout, server, fqdn, dns.query_txt(server, fqdn)).await {
        Ok(answers) => answers,
        Err(QueryError::NxDomain { .. }) => Vec::new(),
        Err(source) => {
            return Err(HeartbeatError::Unreachable {
                fqdn: fqdn.to_string(),
                server: server.to_string(),
                source,
            })
        }
    };

    let raw = answers
        .first()
        .map(|txt| txt.trim().trim_matches('"'))
        .filter(|txt| !txt.is_empty())
        .ok_or_else(|| HeartbeatError::Missing {
            fqdn: fqdn.to_string(),
            server: server.to_string(),
        })?;
    debug!(fqdn = %fqdn, raw = %raw, "Heartbeat TXT record");

    let stamp = NaiveDateTime::parse_from_str(raw, HEARTBEAT_TIMESTAMP_FORMAT)
        .map_err(|_| HeartbeatError::Malformed {
            fqdn: fqdn.to_string(),
            value: raw.to_string(),
        })?
        .and_utc();

    let age = now.signed_duration_since(stamp);
    let limit = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
    debug!(fqdn = %fqdn, age_secs = age.num_seconds(), "Heartbeat age");

    if age > limit {
        return Err(HeartbeatError::Expired {
            fqdn: fqdn.to_string(),
            age_secs: age.num_seconds(),
            threshold_secs: limit.num_seconds(),
        });
    }

    Ok(())
}

/// Consult the heartbeats the strategy needs for this cycle.
///
/// With the split-brain check enabled every peer is checked. Otherwise only a failover
/// secondary checks its primary, so that a missing primary answer can be told apart
/// from a partition. Peers not checked are reported as [`Freshness::Unchecked`].
pub async fn check_peers(
    service: &GlobalService,
    topology: &ClusterTopology,
    dns: &dyn DnsQuerier,
    now: DateTime<Utc>,
) -> PeerFreshness {
    let primary = service.primary_peer(&topology.geo_tag);
    let server = topology.edge_resolver();

    let checks = peer_heartbeat_fqdns(&service.name, topology)
        .into_iter()
        .map(|(geo_tag, fqdn)| {
            let wanted = topology.split_brain_check || primary == Some(geo_tag.as_str());
            let server = server.clone();
            async move {
                if !wanted {
                    return (geo_tag, Freshness::Unchecked);
                }
                let verdict = check_alive(
                    dns,
                    &server,
                    &fqdn,
                    service.split_brain_threshold,
                    topology.query_timeout,
                    now,
                )
                .await;
                match verdict {
                    Ok(()) => {
                        info!(peer = %geo_tag, fqdn = %fqdn, "Peer heartbeat is fresh");
                        metrics::record_heartbeat(&geo_tag, "fresh");
                        (geo_tag, Freshness::Fresh)
                    }
                    Err(e) => {
                        warn!(peer = %geo_tag, "Distrusting peer data: {}", e);
                        metrics::record_heartbeat(&geo_tag, e.verdict());
                        (geo_tag, Freshness::Stale(e))
                    }
                }
            }
        });

    join_all(checks).await.into_iter().collect()
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod heartbeat_tests;
