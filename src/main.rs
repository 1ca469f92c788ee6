// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use clap::Parser;
use futures::StreamExt;
use gslb::{
    config::OperatorConfig,
    constants::{
        ERROR_REQUEUE_DURATION_SECS, KIND_GSLB, METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PATH,
        RECONCILE_TIMEOUT_SECS, TOKIO_WORKER_THREADS,
    },
    context::Context,
    crd::{DNSEndpoint, Gslb},
    dns::HickoryQuerier,
    metrics,
    providers::delegation_for,
    reconcilers::reconcile_gslb,
};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    runtime::{controller::Action, reflector::ObjectRef, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("gslb-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

/// Initialize logging.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or `text`).
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    init_logging();

    let config = OperatorConfig::parse();
    let topology = config.topology().context("Invalid controller configuration")?;
    info!(
        geo_tag = %topology.geo_tag,
        peers = ?topology.peer_geo_tags,
        dns_zone = %topology.dns_zone,
        edge_dns_zone = %topology.edge_dns_zone,
        edge_dns_type = %config.edge_dns_type()?,
        "Starting Gslb controller"
    );
    if topology.peer_geo_tags.is_empty() {
        warn!("No peer clusters configured, only local targets will be published");
    }

    // kube and reqwest both link rustls; pick one process-wide crypto provider.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let http_client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let delegation = delegation_for(&config, &client, &http_client)?;
    if let Some(provider) = &delegation {
        info!("Zone delegation through {}", provider.name());
    }

    let metrics_port = config.metrics_port;
    let ctx = Arc::new(Context {
        client,
        querier: Arc::new(HickoryQuerier::new(topology.query_timeout)),
        topology,
        config: Arc::new(config),
        delegation,
    });

    tokio::select! {
        result = run_gslb_controller(ctx) => {
            result?;
            info!("Gslb controller stopped, shutting down");
            Ok(())
        }
        result = run_metrics_server(metrics_port) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// Map an `Ingress` event to the `Gslb` of the same name.
fn gslb_for_ingress(ingress: &Ingress) -> Option<ObjectRef<Gslb>> {
    let namespace = ingress.namespace()?;
    Some(ObjectRef::new(&ingress.name_any()).within(&namespace))
}

/// Run the `Gslb` controller until a termination signal arrives.
async fn run_gslb_controller(ctx: Arc<Context>) -> Result<()> {
    info!("Starting Gslb controller");

    let client = ctx.client.clone();
    let gslbs = Api::<Gslb>::all(client.clone());
    let endpoints = Api::<DNSEndpoint>::all(client.clone());
    let ingresses = Api::<Ingress>::all(client);

    Controller::new(gslbs, Config::default())
        .owns(endpoints, Config::default())
        .watches(ingresses, Config::default(), |ingress| {
            gslb_for_ingress(&ingress)
        })
        .shutdown_on_signal()
        .run(reconcile_gslb_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `Gslb`, bounded by the reconcile timeout.
async fn reconcile_gslb_wrapper(
    gslb: Arc<Gslb>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    debug!(
        gslb = %gslb.name_any(),
        namespace = ?gslb.namespace(),
        "Reconcile wrapper called for Gslb"
    );

    let outcome = tokio::time::timeout(
        Duration::from_secs(RECONCILE_TIMEOUT_SECS),
        reconcile_gslb(ctx.clone(), (*gslb).clone()),
    )
    .await
    .unwrap_or_else(|_| {
        Err(anyhow::anyhow!(
            "Reconcile timed out after {RECONCILE_TIMEOUT_SECS}s"
        ))
    });

    match outcome {
        Ok(()) => {
            metrics::record_reconciliation_success(KIND_GSLB, start.elapsed());
            metrics::record_reconciliation_requeue(KIND_GSLB, "periodic");
            debug!("Successfully reconciled Gslb: {}", gslb.name_any());
            Ok(Action::requeue(ctx.requeue_interval()))
        }
        Err(e) => {
            metrics::record_reconciliation_error(KIND_GSLB, start.elapsed());
            metrics::record_error(KIND_GSLB, "reconcile");
            error!("Failed to reconcile Gslb {}: {:#}", gslb.name_any(), e);
            Err(e.into())
        }
    }
}

/// Error policy for the controller
fn error_policy(_gslb: Arc<Gslb>, _err: &ReconcileError, _ctx: Arc<Context>) -> Action {
    metrics::record_reconciliation_requeue(KIND_GSLB, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn metrics_router() -> Router {
    Router::new().route(METRICS_SERVER_PATH, get(metrics_handler))
}

/// Serve Prometheus metrics.
async fn run_metrics_server(port: u16) -> Result<()> {
    let addr = format!("{METRICS_SERVER_BIND_ADDRESS}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind metrics server to {addr}"))?;
    info!("Serving metrics on {}{}", addr, METRICS_SERVER_PATH);

    axum::serve(listener, metrics_router())
        .await
        .context("Metrics server failed")
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
