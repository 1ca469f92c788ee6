// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the Gslb controller.
//!
//! Every reconcile receives an `Arc<Context>` holding:
//! - the Kubernetes client
//! - the validated configuration and the cluster topology derived from it
//! - the DNS querier used for every outbound query
//! - the zone-delegation provider selected by `EDGE_DNS_TYPE`, if any

use crate::config::{ClusterTopology, OperatorConfig};
use crate::dns::DnsQuerier;
use crate::providers::ZoneDelegation;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;

/// Shared context passed to the controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Raw configuration, kept for values not part of the topology
    pub config: Arc<OperatorConfig>,

    /// This cluster and its peers
    pub topology: ClusterTopology,

    /// Outbound DNS queries
    pub querier: Arc<dyn DnsQuerier>,

    /// Edge zone delegation; `None` when delegation is managed elsewhere
    pub delegation: Option<Arc<dyn ZoneDelegation>>,
}

impl Context {
    /// Namespace the controller and its `CoreDNS` run in.
    #[must_use]
    pub fn pod_namespace(&self) -> &str {
        &self.config.pod_namespace
    }

    /// Fixed interval after which every Gslb is reconciled again.
    #[must_use]
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.config.reconcile_requeue_seconds)
    }
}
