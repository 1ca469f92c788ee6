// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller configuration and the cluster topology derived from it.
//!
//! Every flag can also be supplied through its environment variable, which is how
//! the controller is configured when deployed:
//!
//! ```text
//! CLUSTER_GEO_TAG=eu
//! EXT_GSLB_CLUSTERS_GEO_TAGS=us,za
//! DNS_ZONE=cloud.example.com
//! EDGE_DNS_ZONE=example.com
//! EDGE_DNS_SERVER=10.0.0.53
//! EDGE_DNS_TYPE=route53
//! ```
//!
//! [`OperatorConfig::topology`] validates the raw values once at startup and yields the
//! immutable [`ClusterTopology`] that is passed explicitly into every component.

use crate::constants::{
    DEFAULT_DNS_QUERY_TIMEOUT_MS, DEFAULT_INFOBLOX_WAPI_PORT, DEFAULT_INFOBLOX_WAPI_VERSION,
    DEFAULT_POD_NAMESPACE, DEFAULT_RECONCILE_REQUEUE_SECS, METRICS_SERVER_PORT,
};
use crate::dns::ResolverSelector;
use crate::dns_errors::GslbError;
use clap::Parser;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Invalid controller configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required value is empty
    #[error("{0} must not be empty")]
    Missing(&'static str),

    /// A geo tag contains characters not allowed in a DNS label
    #[error("Geo tag '{0}' is not a valid DNS label")]
    InvalidGeoTag(String),

    /// This cluster lists itself as a peer
    #[error("Cluster geo tag '{0}' must not appear in EXT_GSLB_CLUSTERS_GEO_TAGS")]
    SelfAsPeer(String),

    /// The managed zone is not below the edge zone
    #[error("DNS zone '{dns_zone}' is not a subdomain of edge DNS zone '{edge_zone}'")]
    ZoneNotDelegated {
        /// Managed zone
        dns_zone: String,
        /// Edge zone
        edge_zone: String,
    },

    /// Infoblox was selected without a grid host
    #[error("INFOBLOX_GRID_HOST is required when EDGE_DNS_TYPE=infoblox")]
    MissingInfobloxGrid,
}

/// Edge DNS provider responsible for delegating the managed zone to the clusters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeDnsType {
    /// AWS Route53 through external-dns
    Route53,
    /// NS1 through external-dns
    Ns1,
    /// Infoblox grid through the WAPI
    Infoblox,
    /// Delegation is managed outside the controller
    None,
}

impl FromStr for EdgeDnsType {
    type Err = GslbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "route53" => Ok(Self::Route53),
            "ns1" => Ok(Self::Ns1),
            "infoblox" => Ok(Self::Infoblox),
            "none" | "" => Ok(Self::None),
            other => Err(GslbError::UnknownEdgeDnsType(other.to_string())),
        }
    }
}

impl fmt::Display for EdgeDnsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Route53 => "route53",
            Self::Ns1 => "ns1",
            Self::Infoblox => "infoblox",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Raw controller configuration as read from flags and environment.
#[derive(Parser, Clone, Debug)]
#[command(name = "gslb", version, about = "Global server load balancing DNS controller")]
pub struct OperatorConfig {
    /// Geo tag of the cluster this controller runs in
    #[arg(long, env = "CLUSTER_GEO_TAG")]
    pub cluster_geo_tag: String,

    /// Geo tags of every peer cluster, in query order
    #[arg(long, env = "EXT_GSLB_CLUSTERS_GEO_TAGS", value_delimiter = ',', default_value = "")]
    pub ext_clusters_geo_tags: Vec<String>,

    /// Zone delegated to the clusters (every managed host lives below it)
    #[arg(long, env = "DNS_ZONE")]
    pub dns_zone: String,

    /// Zone served by the edge DNS provider
    #[arg(long, env = "EDGE_DNS_ZONE")]
    pub edge_dns_zone: String,

    /// Address of the edge DNS server (without port)
    #[arg(long, env = "EDGE_DNS_SERVER")]
    pub edge_dns_server: String,

    /// Edge DNS provider: route53, ns1, infoblox or none
    #[arg(long, env = "EDGE_DNS_TYPE", default_value = "none")]
    pub edge_dns_type: String,

    /// Redirect every DNS query to the local fake resolver
    #[arg(long, env = "FAKE_DNS_ENABLED", default_value_t = false)]
    pub fake_dns_enabled: bool,

    /// Require a fresh heartbeat before trusting a peer's targets
    #[arg(long, env = "SPLIT_BRAIN_CHECK", default_value_t = false)]
    pub split_brain_check: bool,

    /// Per-query timeout for outbound DNS queries, in milliseconds
    #[arg(long, env = "DNS_QUERY_TIMEOUT_MS", default_value_t = DEFAULT_DNS_QUERY_TIMEOUT_MS)]
    pub dns_query_timeout_ms: u64,

    /// Periodic requeue interval, in seconds
    #[arg(long, env = "RECONCILE_REQUEUE_SECONDS", default_value_t = DEFAULT_RECONCILE_REQUEUE_SECS)]
    pub reconcile_requeue_seconds: u64,

    /// Namespace the controller and its `CoreDNS` run in
    #[arg(long, env = "POD_NAMESPACE", default_value = DEFAULT_POD_NAMESPACE)]
    pub pod_namespace: String,

    /// Port of the Prometheus metrics endpoint
    #[arg(long, env = "METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,

    /// Infoblox grid host
    #[arg(long, env = "INFOBLOX_GRID_HOST")]
    pub infoblox_grid_host: Option<String>,

    /// Infoblox WAPI port
    #[arg(long, env = "INFOBLOX_WAPI_PORT", default_value_t = DEFAULT_INFOBLOX_WAPI_PORT)]
    pub infoblox_wapi_port: u16,

    /// Infoblox WAPI version
    #[arg(long, env = "INFOBLOX_WAPI_VERSION", default_value = DEFAULT_INFOBLOX_WAPI_VERSION)]
    pub infoblox_wapi_version: String,

    /// Infoblox WAPI username
    #[arg(long, env = "INFOBLOX_WAPI_USERNAME", default_value = "")]
    pub infoblox_wapi_username: String,

    /// Infoblox WAPI password
    #[arg(long, env = "INFOBLOX_WAPI_PASSWORD", default_value = "", hide_env_values = true)]
    pub infoblox_wapi_password: String,
}

/// Process-wide, read-only view of this cluster and its peers.
///
/// Name-server and heartbeat FQDNs are derived from it deterministically.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterTopology {
    /// This cluster's geo tag
    pub geo_tag: String,
    /// Managed (delegated) zone, without trailing dot
    pub dns_zone: String,
    /// Edge zone, without trailing dot
    pub edge_dns_zone: String,
    /// Edge DNS server address, without port
    pub edge_dns_server: String,
    /// Peer geo tags in configuration order
    pub peer_geo_tags: Vec<String>,
    /// Maps a server name to the resolver address actually queried
    pub resolver: ResolverSelector,
    /// Bound on every outbound DNS query
    pub query_timeout: Duration,
    /// Whether peers must present a fresh heartbeat before their targets count
    pub split_brain_check: bool,
}

impl ClusterTopology {
    /// Resolver address used for queries against the edge DNS server.
    #[must_use]
    pub fn edge_resolver(&self) -> String {
        self.resolver.select(&self.edge_dns_server)
    }
}

/// Infoblox WAPI connection settings.
#[derive(Clone, Debug)]
pub struct InfobloxSettings {
    /// Grid host name
    pub grid_host: String,
    /// WAPI port
    pub port: u16,
    /// WAPI version, e.g. `2.3.1`
    pub version: String,
    /// Basic-auth user
    pub username: String,
    /// Basic-auth password
    pub password: String,
}

impl OperatorConfig {
    /// Validate the raw configuration and derive the cluster topology.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required value is missing, a geo tag is not a
    /// DNS label, the cluster lists itself as a peer, or the managed zone is not below
    /// the edge zone.
    pub fn topology(&self) -> Result<ClusterTopology, ConfigError> {
        let geo_tag = self.cluster_geo_tag.trim().to_string();
        if geo_tag.is_empty() {
            return Err(ConfigError::Missing("CLUSTER_GEO_TAG"));
        }
        if !is_dns_label(&geo_tag) {
            return Err(ConfigError::InvalidGeoTag(geo_tag));
        }

        let dns_zone = normalize_zone(&self.dns_zone);
        if dns_zone.is_empty() {
            return Err(ConfigError::Missing("DNS_ZONE"));
        }
        let edge_dns_zone = normalize_zone(&self.edge_dns_zone);
        if edge_dns_zone.is_empty() {
            return Err(ConfigError::Missing("EDGE_DNS_ZONE"));
        }
        if !crate::gslb::is_in_zone(&dns_zone, &edge_dns_zone) {
            return Err(ConfigError::ZoneNotDelegated {
                dns_zone,
                edge_zone: edge_dns_zone,
            });
        }

        let edge_dns_server = self.edge_dns_server.trim().to_string();
        if edge_dns_server.is_empty() {
            return Err(ConfigError::Missing("EDGE_DNS_SERVER"));
        }

        let mut peer_geo_tags = Vec::new();
        for tag in self
            .ext_clusters_geo_tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
        {
            if !is_dns_label(tag) {
                return Err(ConfigError::InvalidGeoTag(tag.to_string()));
            }
            if tag == geo_tag {
                return Err(ConfigError::SelfAsPeer(geo_tag));
            }
            peer_geo_tags.push(tag.to_string());
        }

        let resolver = if self.fake_dns_enabled {
            ResolverSelector::fake()
        } else {
            ResolverSelector::Direct
        };

        Ok(ClusterTopology {
            geo_tag,
            dns_zone,
            edge_dns_zone,
            edge_dns_server,
            peer_geo_tags,
            resolver,
            query_timeout: Duration::from_millis(self.dns_query_timeout_ms),
            split_brain_check: self.split_brain_check,
        })
    }

    /// Parse the configured edge DNS type.
    ///
    /// # Errors
    ///
    /// Returns [`GslbError::UnknownEdgeDnsType`] for anything but the known providers.
    pub fn edge_dns_type(&self) -> Result<EdgeDnsType, GslbError> {
        self.edge_dns_type.parse()
    }

    /// Infoblox settings, required only when the edge type is Infoblox.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingInfobloxGrid`] if no grid host is configured.
    pub fn infoblox(&self) -> Result<InfobloxSettings, ConfigError> {
        let grid_host = self
            .infoblox_grid_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingInfobloxGrid)?;

        Ok(InfobloxSettings {
            grid_host: grid_host.to_string(),
            port: self.infoblox_wapi_port,
            version: self.infoblox_wapi_version.clone(),
            username: self.infoblox_wapi_username.clone(),
            password: self.infoblox_wapi_password.clone(),
        })
    }
}

/// Lowercase a zone and strip surrounding whitespace and the trailing dot.
#[must_use]
pub fn normalize_zone(zone: &str) -> String {
    zone.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn is_dns_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
