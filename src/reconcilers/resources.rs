// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Create-or-replace helper for the objects the controller owns.
//!
//! Every object written by the controller carries a content hash in the
//! `gslb.firestoned.io/records-hash` annotation. A write is skipped when the object
//! already exists with the same hash, so a steady-state reconcile issues one GET and
//! no update.
//!
//! # Example
//!
//! ```rust,no_run
//! use gslb::reconcilers::resources::create_or_replace;
//! use gslb::crd::DNSEndpoint;
//! use kube::Client;
//! use anyhow::Result;
//!
//! async fn example(client: &Client, endpoint: DNSEndpoint) -> Result<()> {
//!     let outcome = create_or_replace(client, "default", &endpoint).await?;
//!     println!("{outcome}");
//!     Ok(())
//! }
//! ```

use crate::constants::{ANNOTATION_RECORDS_HASH, FIELD_MANAGER};
use anyhow::{Context as _, Result};
use kube::api::PostParams;
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use std::fmt;
use tracing::{debug, info};

/// What a create-or-replace call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    Replaced,
    Unchanged,
}

impl WriteOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Replaced => "replaced",
            Self::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide how `desired` must be written given what currently exists.
///
/// An object is unchanged only when both carry the same, non-empty records hash.
#[must_use]
pub fn plan_write<T: Resource>(existing: Option<&T>, desired: &T) -> WriteOutcome {
    let Some(existing) = existing else {
        return WriteOutcome::Created;
    };

    let hash = |r: &T| {
        r.meta()
            .annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_RECORDS_HASH))
            .filter(|h| !h.is_empty())
            .cloned()
    };

    match (hash(existing), hash(desired)) {
        (Some(current), Some(wanted)) if current == wanted => WriteOutcome::Unchanged,
        _ => WriteOutcome::Replaced,
    }
}

/// Create `resource` if absent, replace it if present and changed.
///
/// The replacement carries the existing object's `resourceVersion`, so a concurrent
/// writer makes this call fail with a conflict instead of being overwritten.
///
/// # Errors
///
/// Returns an error if the resource has no name or an API call fails.
pub async fn create_or_replace<T>(
    client: &Client,
    namespace: &str,
    resource: &T,
) -> Result<WriteOutcome>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource
        .meta()
        .name
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Resource must have a name"))?;

    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let params = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };

    debug!(
        namespace = %namespace,
        name = %name,
        kind = %T::kind(&()),
        "Creating or replacing resource"
    );

    let existing = api
        .get_opt(name)
        .await
        .with_context(|| format!("Failed to get {} {namespace}/{name}", T::kind(&())))?;

    let outcome = plan_write(existing.as_ref(), resource);
    match (outcome, existing) {
        (WriteOutcome::Unchanged, _) => {
            debug!("{} {}/{} is up to date", T::kind(&()), namespace, name);
        }
        (WriteOutcome::Replaced, Some(existing)) => {
            let mut replacement = resource.clone();
            replacement.meta_mut().resource_version = existing.resource_version();
            api.replace(name, &params, &replacement)
                .await
                .with_context(|| format!("Failed to replace {} {namespace}/{name}", T::kind(&())))?;
            info!("Replaced {} {}/{}", T::kind(&()), namespace, name);
        }
        _ => {
            api.create(&params, resource)
                .await
                .with_context(|| format!("Failed to create {} {namespace}/{name}", T::kind(&())))?;
            info!("Created {} {}/{}", T::kind(&()), namespace, name);
        }
    }

    Ok(outcome)
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod resources_tests;
