// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`DnsQuerier`] answering from a fixed table, for unit tests.

use super::DnsQuerier;
use crate::dns_errors::QueryError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Debug)]
enum Answer {
    A(Vec<Ipv4Addr>),
    Txt(Vec<String>),
    Fail(QueryError),
}

/// Table-driven [`DnsQuerier`].
///
/// Keys are `(server, name)` with the name lowercased and without trailing dot.
/// Unknown names answer NXDOMAIN. Every query is recorded and can be inspected
/// with [`MemoryQuerier::queries`].
#[derive(Clone, Debug, Default)]
pub struct MemoryQuerier {
    answers: BTreeMap<(String, String), Answer>,
    delays: BTreeMap<String, Duration>,
    log: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryQuerier {
    /// Empty table; every query answers NXDOMAIN.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer A queries for `name` on `server` with `ips`.
    ///
    /// # Panics
    ///
    /// Panics if an entry of `ips` is not an IPv4 address.
    #[must_use]
    pub fn with_a(mut self, server: &str, name: &str, ips: &[&str]) -> Self {
        let ips = ips
            .iter()
            .map(|ip| ip.parse().expect("test fixture must be an IPv4 address"))
            .collect();
        self.answers.insert(key(server, name), Answer::A(ips));
        self
    }

    /// Answer TXT queries for `name` on `server` with `texts`.
    #[must_use]
    pub fn with_txt(mut self, server: &str, name: &str, texts: &[&str]) -> Self {
        let texts = texts.iter().map(ToString::to_string).collect();
        self.answers.insert(key(server, name), Answer::Txt(texts));
        self
    }

    /// Fail every query for `name` on `server` with a transport error.
    #[must_use]
    pub fn with_failure(mut self, server: &str, name: &str) -> Self {
        let error = QueryError::Transport {
            name: name.to_string(),
            server: server.to_string(),
            reason: "connection refused".to_string(),
        };
        self.answers.insert(key(server, name), Answer::Fail(error));
        self
    }

    /// Delay every answer from `server` by `delay`.
    #[must_use]
    pub fn with_delay(mut self, server: &str, delay: Duration) -> Self {
        self.delays.insert(server.to_string(), delay);
        self
    }

    /// Every `(server, name)` queried so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the query log mutex was poisoned.
    #[must_use]
    pub fn queries(&self) -> Vec<(String, String)> {
        self.log.lock().expect("query log poisoned").clone()
    }

    async fn lookup(&self, server: &str, name: &str) -> Result<Answer, QueryError> {
        if let Ok(mut log) = self.log.lock() {
            log.push((server.to_string(), normalize(name)));
        }

        if let Some(delay) = self.delays.get(server) {
            tokio::time::sleep(*delay).await;
        }

        match self.answers.get(&key(server, name)) {
            Some(Answer::Fail(error)) => Err(error.clone()),
            Some(answer) => Ok(answer.clone()),
            None => Err(QueryError::NxDomain {
                name: name.to_string(),
                server: server.to_string(),
            }),
        }
    }
}

#[async_trait]
impl DnsQuerier for MemoryQuerier {
    async fn query_a(&self, server: &str, fqdn: &str) -> Result<Vec<Ipv4Addr>, QueryError> {
        match self.lookup(server, fqdn).await? {
            Answer::A(ips) => Ok(ips),
            _ => Ok(Vec::new()),
        }
    }

    async fn query_txt(&self, server: &str, fqdn: &str) -> Result<Vec<String>, QueryError> {
        match self.lookup(server, fqdn).await? {
            Answer::Txt(texts) => Ok(texts),
            _ => Ok(Vec::new()),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

fn key(server: &str, name: &str) -> (String, String) {
    (server.to_string(), normalize(name))
}
