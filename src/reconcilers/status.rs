// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers and the `Gslb` status updater.
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (`Ready`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! # Example
//!
//! ```rust,no_run
//! use gslb::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Ready",
//!     "True",
//!     "RecordsPublished",
//!     "2 hosts published"
//! );
//! assert_eq!(condition.r#type, "Ready");
//! ```

use crate::constants::FIELD_MANAGER;
use crate::crd::{Condition, Gslb, GslbStatus};
use crate::gslb::strategy::HostDecision;
use anyhow::{Context as _, Result};
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Condition type set on every `Gslb`.
pub const CONDITION_READY: &str = "Ready";

/// Reason used when the records were computed and written.
pub const REASON_RECORDS_PUBLISHED: &str = "RecordsPublished";

/// Reason used when a reconcile failed before the records could be written.
pub const REASON_RECONCILE_FAILED: &str = "ReconcileFailed";

/// Create a new Kubernetes condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// The `lastTransitionTime` is kept when the status does not change.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    current.len() == new.len()
        && new.iter().all(|new_cond| {
            find_condition(current, &new_cond.r#type).is_some_and(|curr| {
                curr.status == new_cond.status
                    && curr.reason == new_cond.reason
                    && curr.message == new_cond.message
            })
        })
}

/// Host health and published targets as reported in the status.
///
/// `serviceHealth` lists every host; `healthyRecords` lists only global names that
/// are actually published.
#[must_use]
pub fn health_and_records(
    decisions: &[HostDecision],
) -> (BTreeMap<String, String>, BTreeMap<String, Vec<String>>) {
    let service_health = decisions
        .iter()
        .map(|d| (d.host.clone(), d.health.to_string()))
        .collect();
    let healthy_records = decisions
        .iter()
        .filter(|d| !d.final_targets.is_empty())
        .map(|d| (d.host.clone(), d.final_targets.clone()))
        .collect();
    (service_health, healthy_records)
}

/// Collects the status of one `Gslb` during a reconcile and writes it in a single patch.
///
/// # Example
///
/// ```rust,ignore
/// let mut status = GslbStatusUpdater::new(&gslb);
/// status.set_decisions(&decisions);
/// status.set_condition("Ready", "True", "RecordsPublished", "2 hosts published");
/// status.apply(&client).await?;
/// ```
pub struct GslbStatusUpdater {
    namespace: String,
    name: String,
    current_status: Option<GslbStatus>,
    new_status: GslbStatus,
}

impl GslbStatusUpdater {
    /// Start from the current status so unchanged fields and transition times survive.
    #[must_use]
    pub fn new(gslb: &Gslb) -> Self {
        let current_status = gslb.status.clone();
        let mut new_status = current_status.clone().unwrap_or_default();
        new_status.observed_generation = gslb.metadata.generation;

        Self {
            namespace: gslb.namespace().unwrap_or_default(),
            name: gslb.name_any(),
            current_status,
            new_status,
        }
    }

    pub fn set_condition(&mut self, condition_type: &str, status: &str, reason: &str, message: &str) {
        update_condition_in_memory(
            &mut self.new_status.conditions,
            condition_type,
            status,
            reason,
            message,
        );
    }

    /// Record host health and published targets.
    pub fn set_decisions(&mut self, decisions: &[HostDecision]) {
        let (service_health, healthy_records) = health_and_records(decisions);
        self.new_status.service_health = service_health;
        self.new_status.healthy_records = healthy_records;
    }

    #[must_use]
    pub fn status(&self) -> &GslbStatus {
        &self.new_status
    }

    /// Whether the collected status differs from the one on the object.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        match &self.current_status {
            None => true,
            Some(current) => {
                current.service_health != self.new_status.service_health
                    || current.healthy_records != self.new_status.healthy_records
                    || current.observed_generation != self.new_status.observed_generation
                    || !conditions_equal(&current.conditions, &self.new_status.conditions)
            }
        }
    }

    /// JSON merge patch turning the object's status into the collected one.
    ///
    /// A merge patch only removes a map key that it sets to `null`, so every host that
    /// left `serviceHealth` or `healthyRecords` is nulled explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be serialized.
    pub fn status_patch(&self) -> Result<Value> {
        let mut status =
            serde_json::to_value(&self.new_status).context("Failed to serialize Gslb status")?;

        if let Some(current) = &self.current_status {
            null_removed_keys(
                &mut status,
                "serviceHealth",
                &current.service_health,
                &self.new_status.service_health,
            );
            null_removed_keys(
                &mut status,
                "healthyRecords",
                &current.healthy_records,
                &self.new_status.healthy_records,
            );
        }

        Ok(json!({ "status": status }))
    }

    /// Patch the status subresource, skipping the call when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the Kubernetes API call fails.
    pub async fn apply(&self, client: &Client) -> Result<()> {
        if !self.has_changes() {
            debug!(
                "Gslb {}/{} status unchanged, skipping update",
                self.namespace, self.name
            );
            return Ok(());
        }

        let api: Api<Gslb> = Api::namespaced(client.clone(), &self.namespace);
        let patch = self.status_patch()?;
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };

        api.patch_status(&self.name, &params, &Patch::Merge(&patch))
            .await
            .with_context(|| format!("Failed to patch status of Gslb {}/{}", self.namespace, self.name))?;

        debug!(
            "Updated Gslb {}/{} status: {} host(s), {} record(s)",
            self.namespace,
            self.name,
            self.new_status.service_health.len(),
            self.new_status.healthy_records.len()
        );
        Ok(())
    }
}

fn null_removed_keys<V, W>(
    status: &mut Value,
    field: &str,
    current: &BTreeMap<String, V>,
    new: &BTreeMap<String, W>,
) {
    let Some(map) = status.get_mut(field).and_then(Value::as_object_mut) else {
        return;
    };
    for key in current.keys().filter(|key| !new.contains_key(*key)) {
        map.insert(key.clone(), Value::Null);
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
