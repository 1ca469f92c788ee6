// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for global load balancing.
//!
//! # Resource Types
//!
//! - [`Gslb`] - Declares that the same-named `Ingress` is served globally and how
//!   traffic is steered between clusters
//! - [`DNSEndpoint`] - The external-dns resource the controller writes its desired
//!   records into (owned by external-dns, not generated by `crdgen`)
//!
//! # Example: A failover Gslb
//!
//! ```rust,no_run
//! use gslb::crd::{GslbSpec, Strategy, StrategyType};
//!
//! let spec = GslbSpec {
//!     strategy: Strategy {
//!         strategy_type: StrategyType::Failover,
//!         primary_geo_tag: Some("eu".to_string()),
//!         dns_ttl_seconds: Some(30),
//!         split_brain_threshold_seconds: Some(300),
//!     },
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. This controller sets `Ready`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Traffic steering policy.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StrategyType {
    /// Every healthy cluster's targets are returned together
    RoundRobin,
    /// The primary cluster serves alone while healthy
    Failover,
}

impl fmt::Display for StrategyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundRobin => f.write_str("roundRobin"),
            Self::Failover => f.write_str("failover"),
        }
    }
}

/// Strategy block of a [`Gslb`].
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    /// `roundRobin` or `failover`.
    #[serde(rename = "type")]
    pub strategy_type: StrategyType,

    /// Geo tag of the cluster preferred by the failover strategy.
    ///
    /// Required for `failover`, ignored for `roundRobin`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_geo_tag: Option<String>,

    /// TTL of the published records in seconds (default 30).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0, max = 2_147_483_647))]
    pub dns_ttl_seconds: Option<i64>,

    /// Maximum age of a peer heartbeat before its data is distrusted (default 300).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 2_147_483_647))]
    pub split_brain_threshold_seconds: Option<i64>,
}

/// `Gslb` makes the `Ingress` of the same name and namespace resolvable globally.
///
/// Every cluster running the controller reconciles its own copy of the `Gslb`; the
/// clusters learn about each other only through DNS.
///
/// # Example
///
/// ```yaml
/// apiVersion: gslb.firestoned.io/v1alpha1
/// kind: Gslb
/// metadata:
///   name: app
///   namespace: apps
/// spec:
///   strategy:
///     type: failover
///     primaryGeoTag: eu
///     dnsTtlSeconds: 30
///     splitBrainThresholdSeconds: 300
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "gslb.firestoned.io",
    version = "v1alpha1",
    kind = "Gslb",
    namespaced,
    shortname = "gslb",
    doc = "Gslb publishes the same-named Ingress under a global DNS name and steers traffic between clusters using a round-robin or failover strategy.",
    printcolumn = r#"{"name":"Strategy","type":"string","jsonPath":".spec.strategy.type"}"#,
    printcolumn = r#"{"name":"Primary","type":"string","jsonPath":".spec.strategy.primaryGeoTag"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[kube(status = "GslbStatus")]
#[serde(rename_all = "camelCase")]
pub struct GslbSpec {
    /// Steering policy.
    pub strategy: Strategy,
}

/// `Gslb` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GslbStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Health of every managed host as seen by this cluster.
    #[serde(default)]
    pub service_health: BTreeMap<String, String>,

    /// Targets published for every global name.
    #[serde(default)]
    pub healthy_records: BTreeMap<String, Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// One DNS record inside a [`DNSEndpoint`].
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub struct Endpoint {
    /// Fully qualified record name, without trailing dot.
    #[serde(rename = "dnsName")]
    pub dns_name: String,

    /// Record TTL in seconds.
    #[serde(rename = "recordTTL", default)]
    pub record_ttl: i64,

    /// Record type (`A`, `NS`, `TXT`).
    #[serde(rename = "recordType")]
    pub record_type: String,

    /// Record data.
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Desired record set handed to external-dns.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[kube(
    group = "externaldns.k8s.io",
    version = "v1alpha1",
    kind = "DNSEndpoint",
    namespaced,
    derive = "PartialEq",
    doc = "DNSEndpoint is the external-dns CRD source; the controller writes its desired records into it."
)]
pub struct DNSEndpointSpec {
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
