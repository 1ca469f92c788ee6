// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Assembly of per-host decisions into the desired `DNSEndpoint`.
//!
//! For every healthy host a `localtargets-<host>` record carries this cluster's own
//! targets (peers read it), and the global `<host>` record carries the strategy's
//! answer when it is non-empty. No I/O happens here.

use super::peers::local_targets_name;
use super::strategy::HostDecision;
use super::GlobalService;
use crate::constants::{
    ANNOTATION_DNS_TYPE, ANNOTATION_RECORDS_HASH, DNS_TYPE_LOCAL, RECORD_TYPE_A,
};
use crate::crd::{DNSEndpoint, DNSEndpointSpec, Endpoint};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A record named `dns_name` with the given targets.
#[must_use]
pub fn a_record(dns_name: &str, ttl: i64, targets: Vec<String>) -> Endpoint {
    Endpoint {
        dns_name: dns_name.to_string(),
        record_ttl: ttl,
        record_type: RECORD_TYPE_A.to_string(),
        targets,
    }
}

/// Records for one host, local record first.
#[must_use]
pub fn host_records(decision: &HostDecision, ttl: i64) -> Vec<Endpoint> {
    let mut records = Vec::with_capacity(2);

    if let Some(local) = &decision.local_record {
        records.push(a_record(
            &local_targets_name(&decision.host),
            ttl,
            local.clone(),
        ));
    }
    if !decision.final_targets.is_empty() {
        records.push(a_record(
            &decision.host,
            ttl,
            decision.final_targets.clone(),
        ));
    }

    records
}

/// SHA-256 over the JSON form of `records`, used to detect real changes.
#[must_use]
pub fn records_hash(records: &[Endpoint]) -> String {
    let json = serde_json::to_string(records).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build the desired `DNSEndpoint` for `service` from its host decisions.
///
/// The object is named after the Gslb, annotated `dnstype: local`, and owned by the
/// Gslb when an owner reference is available.
#[must_use]
pub fn assemble(service: &GlobalService, decisions: &[HostDecision]) -> DNSEndpoint {
    let endpoints: Vec<Endpoint> = decisions
        .iter()
        .flat_map(|decision| host_records(decision, service.record_ttl))
        .collect();

    let annotations = BTreeMap::from([
        (ANNOTATION_DNS_TYPE.to_string(), DNS_TYPE_LOCAL.to_string()),
        (ANNOTATION_RECORDS_HASH.to_string(), records_hash(&endpoints)),
    ]);

    DNSEndpoint {
        metadata: ObjectMeta {
            name: Some(service.name.clone()),
            namespace: Some(service.namespace.clone()),
            annotations: Some(annotations),
            owner_references: service.owner.clone().map(|owner| vec![owner]),
            ..Default::default()
        },
        spec: DNSEndpointSpec { endpoints },
    }
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod endpoint_tests;
