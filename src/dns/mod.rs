// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Outbound DNS query client.
//!
//! The controller issues only two kinds of queries: A lookups (local load-balancer
//! hostnames and peer `localtargets-` records) and TXT lookups (peer heartbeats).
//! Both go through the [`DnsQuerier`] trait so the engine never talks to the network
//! directly:
//!
//! - [`HickoryQuerier`] sends real UDP queries with hickory-client, each bounded by a
//!   timeout.
//! - `MemoryQuerier` (test builds only) answers from an in-memory table.
//!
//! Which resolver a query is sent to is decided by a [`ResolverSelector`] carried in the
//! cluster topology rather than by a process-wide flag.

pub mod hickory;
#[cfg(test)]
pub mod memory;

pub use hickory::HickoryQuerier;
#[cfg(test)]
pub use memory::MemoryQuerier;

use crate::constants::{DNS_PORT, FAKE_DNS_RESOLVER};
use crate::dns_errors::QueryError;
use async_trait::async_trait;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Capability to issue A and TXT queries against a given resolver.
///
/// `server` is a resolver address in `host:port` form, usually produced by
/// [`ResolverSelector::select`]. Implementations must be safe for concurrent use.
#[async_trait]
pub trait DnsQuerier: Send + Sync {
    /// Query A records for `fqdn`.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] on timeout, transport failure, NXDOMAIN or any other
    /// non-success response code. An empty answer section is `Ok(vec![])`.
    async fn query_a(&self, server: &str, fqdn: &str) -> Result<Vec<Ipv4Addr>, QueryError>;

    /// Query TXT records for `fqdn`, one string per answer with character-strings joined.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`DnsQuerier::query_a`].
    async fn query_txt(&self, server: &str, fqdn: &str) -> Result<Vec<String>, QueryError>;
}

/// Chooses the resolver address a query is actually sent to.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ResolverSelector {
    /// Query the named server itself on the standard DNS port
    #[default]
    Direct,
    /// Send every query to this fixed resolver, whatever server was requested
    Override(String),
}

impl ResolverSelector {
    /// Selector redirecting everything to the local fake resolver.
    #[must_use]
    pub fn fake() -> Self {
        Self::Override(FAKE_DNS_RESOLVER.to_string())
    }

    /// Resolver address for a query meant for `server`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gslb::dns::ResolverSelector;
    ///
    /// assert_eq!(ResolverSelector::Direct.select("10.0.0.53"), "10.0.0.53:53");
    /// assert_eq!(ResolverSelector::Direct.select("fd00::53"), "[fd00::53]:53");
    /// assert_eq!(ResolverSelector::fake().select("10.0.0.53"), "127.0.0.1:7753");
    /// ```
    #[must_use]
    pub fn select(&self, server: &str) -> String {
        match self {
            Self::Direct => {
                let host = server.trim_end_matches('.');
                let host = host
                    .strip_prefix('[')
                    .and_then(|h| h.strip_suffix(']'))
                    .unwrap_or(host);
                match host.parse::<IpAddr>() {
                    Ok(ip) => SocketAddr::new(ip, DNS_PORT).to_string(),
                    Err(_) => format!("{host}:{DNS_PORT}"),
                }
            }
            Self::Override(addr) => addr.clone(),
        }
    }
}

/// Run `query` with an upper bound, turning an elapsed deadline into [`QueryError::Timeout`].
///
/// Applied around every query the engine issues so the bound holds for any
/// [`DnsQuerier`] implementation.
///
/// # Errors
///
/// Returns the query's own error, or [`QueryError::Timeout`] once `timeout` elapses.
pub async fn bounded<T, F>(
    timeout: Duration,
    server: &str,
    name: &str,
    query: F,
) -> Result<T, QueryError>
where
    F: Future<Output = Result<T, QueryError>>,
{
    tokio::time::timeout(timeout, query)
        .await
        .unwrap_or_else(|_| {
            Err(QueryError::Timeout {
                name: name.to_string(),
                server: server.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })
        })
}

/// Append the root label if missing.
#[must_use]
pub fn to_fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
