// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for `Gslb` resources.
//!
//! The controller follows the standard Kubernetes pattern:
//!
//! 1. **Watch** - `Gslb` objects, the `DNSEndpoint`s they own and the `Ingress` of
//!    the same name
//! 2. **Reconcile** - compute the desired records from local health and peer DNS
//! 3. **Update** - create or replace the `DNSEndpoint`, delegate the zone at the edge
//! 4. **Status** - report host health and published records back on the `Gslb`
//!
//! Unlike most controllers, the desired state also depends on what peer clusters
//! publish in DNS, which cannot be watched. Every `Gslb` is therefore reconciled
//! again after a fixed interval even when nothing changed locally.
//!
//! # Example
//!
//! ```rust,no_run
//! use gslb::reconcilers::reconcile_gslb;
//! use gslb::context::Context;
//! use gslb::crd::Gslb;
//! use std::sync::Arc;
//!
//! async fn run_once(ctx: Arc<Context>, gslb: Gslb) -> anyhow::Result<()> {
//!     reconcile_gslb(ctx, gslb).await
//! }
//! ```

pub mod gslb;
pub mod resources;
pub mod retry;
pub mod status;

pub use gslb::reconcile_gslb;
