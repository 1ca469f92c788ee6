// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone delegation through external-dns (Route53, NS1).
//!
//! The controller writes a second `DNSEndpoint`, `<gslb>-ns-extdns`, annotated
//! `dnstype: extdns` so that only the external-dns instance pointed at the edge
//! provider picks it up. It holds:
//!
//! - an NS record for the managed zone listing every cluster's name server
//! - an A glue record for this cluster's name server
//! - this cluster's heartbeat TXT record

use super::{DelegationRequest, ZoneDelegation};
use crate::config::EdgeDnsType;
use crate::constants::{
    ANNOTATION_DNS_TYPE, ANNOTATION_RECORDS_HASH, DNS_TYPE_EXTDNS, KIND_DNS_ENDPOINT, RECORD_TYPE_A,
    RECORD_TYPE_NS, RECORD_TYPE_TXT,
};
use crate::crd::{DNSEndpoint, DNSEndpointSpec, Endpoint};
use crate::gslb::endpoint::records_hash;
use crate::gslb::heartbeat::{format_heartbeat, heartbeat_fqdn};
use crate::gslb::peers::{ns_server_name, peer_ns_server_names};
use crate::metrics;
use crate::reconcilers::resources::create_or_replace;
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::Client;
use std::collections::BTreeMap;
use tracing::info;

/// Name of the delegation `DNSEndpoint` for a Gslb.
#[must_use]
pub fn delegation_endpoint_name(gslb_name: &str) -> String {
    format!("{gslb_name}-ns-extdns")
}

/// Build the delegation `DNSEndpoint` for one Gslb.
#[must_use]
pub fn build_delegation_endpoint(request: &DelegationRequest<'_>) -> DNSEndpoint {
    let service = request.service;
    let topology = request.topology;
    let ttl = service.record_ttl;

    let own_ns = ns_server_name(&topology.dns_zone, &topology.geo_tag, &topology.edge_dns_zone);
    let mut name_servers = vec![own_ns.clone()];
    name_servers.extend(peer_ns_server_names(topology).into_iter().map(|(_, ns)| ns));

    let endpoints = vec![
        Endpoint {
            dns_name: topology.dns_zone.clone(),
            record_ttl: ttl,
            record_type: RECORD_TYPE_NS.to_string(),
            targets: name_servers,
        },
        Endpoint {
            dns_name: own_ns,
            record_ttl: ttl,
            record_type: RECORD_TYPE_A.to_string(),
            targets: request.exposed_ips.to_vec(),
        },
        Endpoint {
            dns_name: heartbeat_fqdn(&service.name, &topology.geo_tag, &topology.edge_dns_zone),
            record_ttl: ttl,
            record_type: RECORD_TYPE_TXT.to_string(),
            targets: vec![format_heartbeat(request.now)],
        },
    ];

    let annotations = BTreeMap::from([
        (ANNOTATION_DNS_TYPE.to_string(), DNS_TYPE_EXTDNS.to_string()),
        (ANNOTATION_RECORDS_HASH.to_string(), records_hash(&endpoints)),
    ]);

    DNSEndpoint {
        metadata: ObjectMeta {
            name: Some(delegation_endpoint_name(&service.name)),
            namespace: Some(service.namespace.clone()),
            annotations: Some(annotations),
            owner_references: service.owner.clone().map(|owner| vec![owner]),
            ..Default::default()
        },
        spec: DNSEndpointSpec { endpoints },
    }
}

/// Route53 and NS1 delegation via external-dns.
pub struct ExternalDnsDelegation {
    client: Client,
    edge: EdgeDnsType,
}

impl ExternalDnsDelegation {
    #[must_use]
    pub fn new(client: Client, edge: EdgeDnsType) -> Self {
        Self { client, edge }
    }
}

#[async_trait]
impl ZoneDelegation for ExternalDnsDelegation {
    fn name(&self) -> &'static str {
        match self.edge {
            EdgeDnsType::Ns1 => "ns1",
            _ => "route53",
        }
    }

    async fn configure_zone_delegation(&self, request: &DelegationRequest<'_>) -> Result<()> {
        let endpoint = build_delegation_endpoint(request);
        let namespace = request.service.namespace.as_str();

        let outcome = create_or_replace(&self.client, namespace, &endpoint)
            .await
            .with_context(|| {
                format!(
                    "Failed to write {} delegation for Gslb {namespace}/{}",
                    self.name(),
                    request.service.name
                )
            })?;
        metrics::record_resource_write(KIND_DNS_ENDPOINT, outcome.as_str());

        info!(
            provider = self.name(),
            gslb = %request.service.name,
            "Zone delegation for {} {}",
            request.topology.dns_zone,
            outcome
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "external_dns_tests.rs"]
mod external_dns_tests;
