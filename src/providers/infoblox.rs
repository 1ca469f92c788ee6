// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone delegation through the Infoblox WAPI.
//!
//! The managed zone is a `zone_delegated` object whose `delegate_to` list holds one
//! entry per exposed address of every cluster's name server. On every reconcile this
//! cluster:
//!
//! 1. creates the object with its own entries if it does not exist, or
//! 2. replaces its own entries, drops entries of peers whose heartbeat is stale, and
//!    writes the list back if it changed;
//! 3. creates or refreshes its heartbeat `record:txt`.

use super::{DelegationRequest, ZoneDelegation};
use crate::config::InfobloxSettings;
use crate::constants::INFOBLOX_HTTP_TIMEOUT_SECS;
use crate::gslb::heartbeat::{check_alive, format_heartbeat, heartbeat_fqdn};
use crate::gslb::peers::{ns_server_name, peer_ns_server_names};
use crate::reconcilers::retry::{is_retryable_http_status, retry_with, wapi_backoff};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

/// WAPI call failure.
#[derive(Error, Debug)]
pub enum WapiError {
    /// The request never got a response
    #[error("Failed to send {method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The grid answered with an error status
    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The response body is not what the object type promises
    #[error("Unexpected WAPI response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured grid address is not a valid URL
    #[error("Invalid WAPI base URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

fn is_retryable_wapi_error(err: &WapiError) -> bool {
    match err {
        WapiError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
        WapiError::Status { status, .. } => is_retryable_http_status(*status),
        _ => false,
    }
}

/// One `delegate_to` entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameServer {
    pub address: String,
    pub name: String,
}

/// `zone_delegated` object.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ZoneDelegated {
    #[serde(rename = "_ref")]
    pub reference: String,
    pub fqdn: String,
    #[serde(default)]
    pub delegate_to: Vec<NameServer>,
}

/// `record:txt` object.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct TxtRecord {
    #[serde(rename = "_ref")]
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub text: String,
}

/// Minimal WAPI client for the two object types the controller manages.
#[derive(Clone, Debug)]
pub struct WapiClient {
    http: reqwest::Client,
    base: String,
    username: String,
    password: String,
}

impl WapiClient {
    /// Client for `base_url`, e.g. `https://grid.example.com:443/wapi/v2.3.1`.
    ///
    /// # Errors
    ///
    /// Returns [`WapiError::InvalidUrl`] if `base_url` does not parse.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, WapiError> {
        let base = base_url.trim_end_matches('/').to_string();
        Url::parse(&base).map_err(|source| WapiError::InvalidUrl {
            url: base.clone(),
            source,
        })?;

        Ok(Self {
            http,
            base,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Client for the configured grid.
    ///
    /// # Errors
    ///
    /// Returns [`WapiError::InvalidUrl`] if the grid host does not form a valid URL.
    pub fn from_settings(http: reqwest::Client, settings: &InfobloxSettings) -> Result<Self, WapiError> {
        let base = format!(
            "https://{}:{}/wapi/v{}",
            settings.grid_host, settings.port, settings.version
        );
        Self::new(http, &base, &settings.username, &settings.password)
    }

    async fn request_once(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&serde_json::Value>,
    ) -> Result<String, WapiError> {
        debug!(method = %method, url = %url, body = ?body, "WAPI request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .timeout(Duration::from_secs(INFOBLOX_HTTP_TIMEOUT_SECS));
        if let Some(body) = body {
            request = request.json(body);
        }

        let transport = |source: reqwest::Error| WapiError::Transport {
            method: method.clone(),
            url: url.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(WapiError::Status {
                status,
                message: text,
            });
        }
        Ok(text)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let raw = format!("{}/{}", self.base, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|source| WapiError::InvalidUrl { url: raw, source })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let operation = format!("{method} {path}");

        let text = retry_with(
            || self.request_once(&method, &url, body.as_ref()),
            &operation,
            wapi_backoff(),
            is_retryable_wapi_error,
        )
        .await?;

        serde_json::from_str(&text)
            .map_err(|source| WapiError::Decode {
                url: url.to_string(),
                source,
            })
            .map_err(Into::into)
    }

    /// Look up the delegation object for `fqdn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid cannot be queried.
    pub async fn find_zone_delegated(&self, fqdn: &str) -> Result<Option<ZoneDelegated>> {
        let zones: Vec<ZoneDelegated> = self
            .request(
                Method::GET,
                "zone_delegated",
                &[("fqdn", fqdn), ("_return_fields", "fqdn,delegate_to")],
                None,
            )
            .await
            .with_context(|| format!("Failed to look up delegated zone {fqdn}"))?;
        Ok(zones.into_iter().next())
    }

    /// Create the delegation object for `fqdn`, returning its reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid rejects the object.
    pub async fn create_zone_delegated(
        &self,
        fqdn: &str,
        delegate_to: &[NameServer],
    ) -> Result<String> {
        self.request(
            Method::POST,
            "zone_delegated",
            &[],
            Some(json!({ "fqdn": fqdn, "delegate_to": delegate_to })),
        )
        .await
        .with_context(|| format!("Failed to create delegated zone {fqdn}"))
    }

    /// Replace the `delegate_to` list of an existing delegation object.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid rejects the update.
    pub async fn update_zone_delegated(
        &self,
        reference: &str,
        delegate_to: &[NameServer],
    ) -> Result<String> {
        self.request(
            Method::PUT,
            reference,
            &[],
            Some(json!({ "delegate_to": delegate_to })),
        )
        .await
        .with_context(|| format!("Failed to update delegated zone {reference}"))
    }

    /// Look up the TXT record `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid cannot be queried.
    pub async fn find_txt_record(&self, name: &str) -> Result<Option<TxtRecord>> {
        let records: Vec<TxtRecord> = self
            .request(
                Method::GET,
                "record:txt",
                &[("name", name), ("_return_fields", "name,text")],
                None,
            )
            .await
            .with_context(|| format!("Failed to look up TXT record {name}"))?;
        Ok(records.into_iter().next())
    }

    /// Create a TXT record, returning its reference.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid rejects the record.
    pub async fn create_txt_record(&self, name: &str, text: &str, ttl: i64) -> Result<String> {
        self.request(
            Method::POST,
            "record:txt",
            &[],
            Some(json!({ "name": name, "text": text, "ttl": ttl, "use_ttl": true })),
        )
        .await
        .with_context(|| format!("Failed to create TXT record {name}"))
    }

    /// Replace the text of an existing TXT record.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid rejects the update.
    pub async fn update_txt_record(&self, reference: &str, text: &str) -> Result<String> {
        self.request(Method::PUT, reference, &[], Some(json!({ "text": text })))
            .await
            .with_context(|| format!("Failed to update TXT record {reference}"))
    }
}

/// New `delegate_to` list: entries named `own_name` are replaced by `own`, entries of
/// `stale` name servers are dropped, everything else keeps its position.
#[must_use]
pub fn merge_delegate_to(
    existing: &[NameServer],
    own_name: &str,
    own: &[NameServer],
    stale: &[String],
) -> Vec<NameServer> {
    existing
        .iter()
        .filter(|ns| ns.name != own_name && !stale.contains(&ns.name))
        .cloned()
        .chain(own.iter().cloned())
        .collect()
}

/// Infoblox delegation.
pub struct InfobloxDelegation {
    wapi: WapiClient,
}

impl InfobloxDelegation {
    #[must_use]
    pub fn new(wapi: WapiClient) -> Self {
        Self { wapi }
    }

    /// Name servers of peers whose heartbeat fails the staleness guard.
    async fn stale_peer_name_servers(&self, request: &DelegationRequest<'_>) -> Vec<String> {
        let topology = request.topology;
        let server = topology.edge_resolver();
        let mut stale = Vec::new();

        for (geo_tag, name_server) in peer_ns_server_names(topology) {
            let fqdn = heartbeat_fqdn(&request.service.name, &geo_tag, &topology.edge_dns_zone);
            if let Err(e) = check_alive(
                request.dns,
                &server,
                &fqdn,
                request.service.split_brain_threshold,
                topology.query_timeout,
                request.now,
            )
            .await
            {
                warn!(peer = %geo_tag, "Removing {} from zone delegation: {}", name_server, e);
                stale.push(name_server);
            }
        }
        stale
    }

    async fn refresh_heartbeat(&self, request: &DelegationRequest<'_>) -> Result<()> {
        let topology = request.topology;
        let name = heartbeat_fqdn(
            &request.service.name,
            &topology.geo_tag,
            &topology.edge_dns_zone,
        );
        let text = format_heartbeat(request.now);

        match self.wapi.find_txt_record(&name).await? {
            Some(record) => {
                self.wapi.update_txt_record(&record.reference, &text).await?;
            }
            None => {
                self.wapi
                    .create_txt_record(&name, &text, request.service.record_ttl)
                    .await?;
            }
        }
        debug!(record = %name, heartbeat = %text, "Heartbeat TXT record refreshed");
        Ok(())
    }
}

#[async_trait]
impl ZoneDelegation for InfobloxDelegation {
    fn name(&self) -> &'static str {
        "infoblox"
    }

    async fn configure_zone_delegation(&self, request: &DelegationRequest<'_>) -> Result<()> {
        let topology = request.topology;
        let own_name = ns_server_name(&topology.dns_zone, &topology.geo_tag, &topology.edge_dns_zone);
        let own: Vec<NameServer> = request
            .exposed_ips
            .iter()
            .map(|ip| NameServer {
                address: ip.clone(),
                name: own_name.clone(),
            })
            .collect();

        match self.wapi.find_zone_delegated(&topology.dns_zone).await? {
            Some(zone) => {
                let stale = self.stale_peer_name_servers(request).await;
                let delegate_to = merge_delegate_to(&zone.delegate_to, &own_name, &own, &stale);
                if delegate_to == zone.delegate_to {
                    debug!(zone = %zone.fqdn, "Zone delegation is up to date");
                } else {
                    info!(zone = %zone.fqdn, ?delegate_to, "Updating zone delegation");
                    self.wapi
                        .update_zone_delegated(&zone.reference, &delegate_to)
                        .await?;
                }
            }
            None => {
                info!(zone = %topology.dns_zone, ?own, "Creating zone delegation");
                self.wapi
                    .create_zone_delegated(&topology.dns_zone, &own)
                    .await?;
            }
        }

        self.refresh_heartbeat(request).await
    }
}

#[cfg(test)]
#[path = "infoblox_tests.rs"]
mod infoblox_tests;
