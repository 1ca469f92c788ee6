// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS wire queries over UDP using hickory-client.

use super::{to_fqdn, DnsQuerier};
use crate::dns_errors::QueryError;
use async_trait::async_trait;
use hickory_client::client::{AsyncClient, ClientHandle};
use hickory_client::op::ResponseCode;
use hickory_client::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_client::udp::UdpClientStream;
use hickory_proto::rr::rdata::{A, TXT};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// [`DnsQuerier`] backed by a fresh hickory UDP client per query.
///
/// Each query is bounded by `timeout`, covering server name resolution, the exchange
/// itself and retransmissions. Dropping the returned future cancels the query.
#[derive(Clone, Debug)]
pub struct HickoryQuerier {
    timeout: Duration,
}

impl HickoryQuerier {
    /// Create a querier with the given per-query timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    async fn exchange(
        &self,
        server: &str,
        fqdn: &str,
        record_type: RecordType,
    ) -> Result<Vec<Record>, QueryError> {
        let query_name = to_fqdn(fqdn);

        match tokio::time::timeout(self.timeout, self.exchange_inner(server, &query_name, record_type))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout {
                name: query_name,
                server: server.to_string(),
                timeout_ms: self.timeout_ms(),
            }),
        }
    }

    async fn exchange_inner(
        &self,
        server: &str,
        query_name: &str,
        record_type: RecordType,
    ) -> Result<Vec<Record>, QueryError> {
        let name = Name::from_ascii(query_name).map_err(|e| QueryError::InvalidName {
            name: query_name.to_string(),
            reason: e.to_string(),
        })?;

        let address = resolve_server(server).await?;

        let transport_error = |reason: String| QueryError::Transport {
            name: query_name.to_string(),
            server: server.to_string(),
            reason,
        };

        let stream = UdpClientStream::<UdpSocket>::with_timeout(address, self.timeout);
        let (mut client, background) = AsyncClient::connect(stream)
            .await
            .map_err(|e| transport_error(e.to_string()))?;
        let background = tokio::spawn(background);

        debug!(server = %server, name = %query_name, ?record_type, "Sending DNS query");
        let response = client.query(name, DNSClass::IN, record_type).await;
        background.abort();
        let response = response.map_err(|e| transport_error(e.to_string()))?;

        match response.response_code() {
            ResponseCode::NoError => Ok(response
                .answers()
                .iter()
                .filter(|r| r.record_type() == record_type)
                .cloned()
                .collect()),
            ResponseCode::NXDomain => Err(QueryError::NxDomain {
                name: query_name.to_string(),
                server: server.to_string(),
            }),
            other => Err(QueryError::ServerFailure {
                name: query_name.to_string(),
                server: server.to_string(),
                response_code: other.to_string(),
            }),
        }
    }
}

#[async_trait]
impl DnsQuerier for HickoryQuerier {
    async fn query_a(&self, server: &str, fqdn: &str) -> Result<Vec<Ipv4Addr>, QueryError> {
        let records = self.exchange(server, fqdn, RecordType::A).await?;

        Ok(records
            .iter()
            .filter_map(|record| match record.data() {
                Some(RData::A(A(ip))) => Some(*ip),
                _ => None,
            })
            .collect())
    }

    async fn query_txt(&self, server: &str, fqdn: &str) -> Result<Vec<String>, QueryError> {
        let records = self.exchange(server, fqdn, RecordType::TXT).await?;

        Ok(records
            .iter()
            .filter_map(|record| match record.data() {
                Some(RData::TXT(txt)) => Some(txt_payload(txt)),
                _ => None,
            })
            .collect())
    }
}

/// Concatenate the character-strings of a TXT record.
fn txt_payload(txt: &TXT) -> String {
    txt.txt_data()
        .iter()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

/// Turn `host:port` into a socket address, resolving the host through the system resolver.
async fn resolve_server(server: &str) -> Result<SocketAddr, QueryError> {
    if let Ok(address) = server.parse::<SocketAddr>() {
        return Ok(address);
    }

    let invalid = |reason: String| QueryError::InvalidServer {
        server: server.to_string(),
        reason,
    };

    let mut candidates: Vec<SocketAddr> = tokio::net::lookup_host(server)
        .await
        .map_err(|e| invalid(e.to_string()))?
        .collect();
    // IPv4 first
    candidates.sort_by_key(|addr| !addr.is_ipv4());

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| invalid("name resolved to no addresses".to_string()))
}
