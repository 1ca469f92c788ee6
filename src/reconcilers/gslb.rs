// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Gslb` reconciliation.
//!
//! One reconcile:
//!
//! 1. reads the `Ingress` of the same name and derives the health of every rule host
//!    from the `Endpoints` of its backend Services
//! 2. computes the desired `DNSEndpoint` ([`crate::gslb`]) and writes it
//! 3. delegates the managed zone at the edge, when a provider is configured
//! 4. patches the `Gslb` status
//!
//! Peer state is only observable through DNS, so reconciles are also driven by a fixed
//! requeue interval in addition to watch events.

use super::resources::create_or_replace;
use super::retry::retry_api_call;
use super::status::{
    GslbStatusUpdater, CONDITION_READY, REASON_RECONCILE_FAILED, REASON_RECORDS_PUBLISHED,
};
use crate::constants::{COREDNS_SERVICE_NAME, KIND_DNS_ENDPOINT};
use crate::context::Context;
use crate::crd::Gslb;
use crate::gslb::local_targets::{coredns_exposed_ips, IngressEndpoint};
use crate::gslb::{decide_hosts, endpoint, GlobalService, HealthMap, HealthStatus};
use crate::metrics;
use crate::providers::DelegationRequest;
use anyhow::{anyhow, Context as _, Result};
use chrono::Utc;
use k8s_openapi::api::core::v1::{Endpoints, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Api, ResourceExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Backend Services per rule host of an `Ingress`.
///
/// Rules without a host are skipped. A host listed by several rules collects the
/// backends of all of them.
#[must_use]
pub fn ingress_hosts(ingress: &Ingress) -> BTreeMap<String, BTreeSet<String>> {
    let mut hosts: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    let rules = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_ref())
        .into_iter()
        .flatten();

    for rule in rules {
        let Some(host) = rule.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) else {
            continue;
        };
        let services = hosts.entry(host.to_ascii_lowercase()).or_default();
        let backends = rule
            .http
            .as_ref()
            .map(|http| http.paths.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|path| path.backend.service.as_ref())
            .map(|service| service.name.clone());
        services.extend(backends);
    }

    hosts
}

/// Load-balancer entries published in an `Ingress` status.
#[must_use]
pub fn ingress_endpoints(ingress: &Ingress) -> Vec<IngressEndpoint> {
    ingress
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .map(|entries| entries.iter().map(IngressEndpoint::from).collect())
        .unwrap_or_default()
}

/// Load-balancer entries published in a `Service` status.
#[must_use]
pub fn service_endpoints(service: &Service) -> Vec<IngressEndpoint> {
    service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .map(|entries| entries.iter().map(IngressEndpoint::from).collect())
        .unwrap_or_default()
}

/// Whether an `Endpoints` object has at least one ready address.
#[must_use]
pub fn has_ready_address(endpoints: &Endpoints) -> bool {
    endpoints
        .subsets
        .as_ref()
        .into_iter()
        .flatten()
        .any(|subset| subset.addresses.as_ref().is_some_and(|a| !a.is_empty()))
}

/// Health per host given the set of backend Services that have ready addresses.
///
/// A host is healthy when any of its backends is ready.
#[must_use]
pub fn host_health(
    hosts: &BTreeMap<String, BTreeSet<String>>,
    ready_services: &BTreeSet<String>,
) -> HealthMap {
    hosts
        .iter()
        .map(|(host, services)| {
            let status = if services.iter().any(|s| ready_services.contains(s)) {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            };
            (host.clone(), status)
        })
        .collect()
}

async fn ready_services(
    ctx: &Context,
    namespace: &str,
    hosts: &BTreeMap<String, BTreeSet<String>>,
) -> Result<BTreeSet<String>> {
    let api: Api<Endpoints> = Api::namespaced(ctx.client.clone(), namespace);
    let wanted: BTreeSet<&String> = hosts.values().flatten().collect();
    let mut ready = BTreeSet::new();

    for service in wanted {
        let endpoints = retry_api_call(
            || api.get_opt(service),
            &format!("get endpoints {namespace}/{service}"),
        )
        .await?;

        match endpoints {
            Some(endpoints) if has_ready_address(&endpoints) => {
                ready.insert(service.clone());
            }
            Some(_) => debug!("Service {}/{} has no ready endpoints", namespace, service),
            None => debug!("Service {}/{} has no endpoints object", namespace, service),
        }
    }

    Ok(ready)
}

async fn delegate_zone(ctx: &Context, service: &GlobalService) -> Result<()> {
    let Some(delegation) = &ctx.delegation else {
        return Ok(());
    };

    let namespace = ctx.pod_namespace();
    let api: Api<Service> = Api::namespaced(ctx.client.clone(), namespace);
    let coredns = retry_api_call(
        || api.get(COREDNS_SERVICE_NAME),
        &format!("get service {namespace}/{COREDNS_SERVICE_NAME}"),
    )
    .await?;

    let exposed_ips = coredns_exposed_ips(
        COREDNS_SERVICE_NAME,
        &service_endpoints(&coredns),
        &ctx.topology,
        ctx.querier.as_ref(),
    )
    .await?;

    let request = DelegationRequest {
        service,
        topology: &ctx.topology,
        exposed_ips: &exposed_ips,
        dns: ctx.querier.as_ref(),
        now: Utc::now(),
    };
    delegation
        .configure_zone_delegation(&request)
        .await
        .with_context(|| format!("{} zone delegation failed", delegation.name()))
}

async fn publish(ctx: &Context, gslb: &Gslb, status: &mut GslbStatusUpdater) -> Result<()> {
    let namespace = gslb.namespace().unwrap_or_default();
    let name = gslb.name_any();

    let ingresses: Api<Ingress> = Api::namespaced(ctx.client.clone(), &namespace);
    let ingress = retry_api_call(
        || ingresses.get_opt(&name),
        &format!("get ingress {namespace}/{name}"),
    )
    .await?
    .ok_or_else(|| anyhow!("Ingress {namespace}/{name} not found"))?;

    let hosts = ingress_hosts(&ingress);
    let ready = ready_services(ctx, &namespace, &hosts).await?;
    let health = host_health(&hosts, &ready);
    debug!(gslb = %name, ?health, "Service health");

    let service = GlobalService::from_gslb(gslb, &ctx.topology)?;
    let decisions = decide_hosts(
        &service,
        &ctx.topology,
        &health,
        &ingress_endpoints(&ingress),
        ctx.querier.as_ref(),
        Utc::now(),
    )
    .await?;
    let desired = endpoint::assemble(&service, &decisions);

    let outcome = create_or_replace(&ctx.client, &namespace, &desired).await?;
    metrics::record_resource_write(KIND_DNS_ENDPOINT, outcome.as_str());

    let healthy = health
        .values()
        .filter(|h| **h == HealthStatus::Healthy)
        .count();
    metrics::record_published(&namespace, &name, desired.spec.endpoints.len(), healthy);

    delegate_zone(ctx, &service).await?;

    status.set_decisions(&decisions);
    status.set_condition(
        CONDITION_READY,
        "True",
        REASON_RECORDS_PUBLISHED,
        &format!(
            "{} record(s) published for {} host(s), {} healthy",
            desired.spec.endpoints.len(),
            health.len(),
            healthy
        ),
    );
    info!(
        gslb = %name,
        namespace = %namespace,
        "DNSEndpoint {}, {} record(s)",
        outcome,
        desired.spec.endpoints.len()
    );
    Ok(())
}

/// Reconcile one `Gslb`.
///
/// The `Ready` condition reflects the outcome; on failure it carries the error and
/// the error is returned so the controller requeues.
///
/// # Errors
///
/// Returns an error if the `Ingress` is missing, a host is outside the managed zone,
/// local targets cannot be resolved, or a Kubernetes or edge DNS write fails.
pub async fn reconcile_gslb(ctx: Arc<Context>, gslb: Gslb) -> Result<()> {
    let mut status = GslbStatusUpdater::new(&gslb);

    let result = publish(&ctx, &gslb, &mut status).await;
    if let Err(e) = &result {
        status.set_condition(
            CONDITION_READY,
            "False",
            REASON_RECONCILE_FAILED,
            &format!("{e:#}"),
        );
    }

    if let Err(e) = status.apply(&ctx.client).await {
        warn!(gslb = %gslb.name_any(), "Status update failed: {:#}", e);
        if result.is_ok() {
            return Err(e);
        }
    }

    result
}

#[cfg(test)]
#[path = "gslb_tests.rs"]
mod gslb_tests;
