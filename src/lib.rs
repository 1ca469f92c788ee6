// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # gslb - Multi-cluster global server load balancing for Kubernetes
//!
//! Every participating cluster runs this controller. For each `Gslb` resource it
//! publishes a `DNSEndpoint` (consumed by external-dns) whose records steer clients
//! of a global host name to the clusters currently able to serve it.
//!
//! Clusters never talk to each other directly. Each one:
//!
//! - publishes `localtargets-<host>` with its own healthy ingress addresses,
//! - reads the same record from every peer through the peer's name server,
//! - publishes a heartbeat TXT record at the edge DNS provider, and
//! - reads peer heartbeats to decide whether a peer is still alive.
//!
//! ## Modules
//!
//! - [`crd`] - `Gslb` and `DNSEndpoint` custom resources
//! - [`config`] - Flags/environment and the derived cluster topology
//! - [`dns`] - Outbound DNS queries
//! - [`gslb`] - Target resolution and traffic steering
//! - [`providers`] - Zone delegation at the edge DNS provider
//! - [`reconcilers`] - Kubernetes reconciliation
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use gslb::crd::{GslbSpec, Strategy, StrategyType};
//!
//! let spec = GslbSpec {
//!     strategy: Strategy {
//!         strategy_type: StrategyType::RoundRobin,
//!         primary_geo_tag: None,
//!         dns_ttl_seconds: Some(30),
//!         split_brain_threshold_seconds: None,
//!     },
//! };
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod dns;
pub mod dns_errors;
pub mod gslb;
pub mod metrics;
pub mod providers;
pub mod reconcilers;
