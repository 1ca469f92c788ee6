// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone delegation at the edge DNS provider.
//!
//! Each cluster must be listed as a name server for the managed zone at the edge,
//! and must keep its heartbeat TXT record current there. How that is done depends on
//! the edge provider:
//!
//! - **Route53 / NS1**: records are handed to external-dns through a second
//!   `DNSEndpoint` ([`external_dns`])
//! - **Infoblox**: the WAPI is called directly ([`infoblox`])
//! - **None**: nothing is delegated
//!
//! Providers implement [`ZoneDelegation`] and are constructed by [`delegation_for`].

pub mod external_dns;
pub mod infoblox;

use crate::config::{ClusterTopology, EdgeDnsType, OperatorConfig};
use crate::dns::DnsQuerier;
use crate::gslb::GlobalService;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kube::Client;
use std::sync::Arc;

/// Everything a provider needs to delegate the zone for one Gslb.
pub struct DelegationRequest<'a> {
    pub service: &'a GlobalService,
    pub topology: &'a ClusterTopology,
    /// Addresses of this cluster's exposed CoreDNS
    pub exposed_ips: &'a [String],
    /// Used to check peer heartbeats before keeping their delegation
    pub dns: &'a dyn DnsQuerier,
    pub now: DateTime<Utc>,
}

/// Capability to configure zone delegation at the edge DNS provider.
#[async_trait]
pub trait ZoneDelegation: Send + Sync {
    /// Provider name used in logs.
    fn name(&self) -> &'static str;

    /// Make the edge delegate the managed zone to this cluster and refresh its heartbeat.
    ///
    /// # Errors
    ///
    /// Returns an error if the edge provider cannot be updated.
    async fn configure_zone_delegation(&self, request: &DelegationRequest<'_>) -> Result<()>;
}

/// Build the provider selected by `EDGE_DNS_TYPE`; `None` means no delegation.
///
/// # Errors
///
/// Returns an error for an unrecognized edge type or incomplete Infoblox settings.
pub fn delegation_for(
    config: &OperatorConfig,
    client: &Client,
    http: &reqwest::Client,
) -> Result<Option<Arc<dyn ZoneDelegation>>> {
    let provider: Option<Arc<dyn ZoneDelegation>> = match config.edge_dns_type()? {
        edge @ (EdgeDnsType::Route53 | EdgeDnsType::Ns1) => Some(Arc::new(
            external_dns::ExternalDnsDelegation::new(client.clone(), edge),
        )),
        EdgeDnsType::Infoblox => {
            let settings = config.infoblox()?;
            Some(Arc::new(infoblox::InfobloxDelegation::new(
                infoblox::WapiClient::from_settings(http.clone(), &settings)?,
            )))
        }
        EdgeDnsType::None => None,
    };
    Ok(provider)
}
