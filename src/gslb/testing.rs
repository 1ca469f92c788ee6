// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for the engine's unit tests.
//!
//! Topology: this cluster is `eu`, peers are `us` then `za`, the managed zone is
//! `cloud.example.com` under the edge zone `example.com`, served by `10.0.0.53`.

use super::GlobalService;
use crate::config::ClusterTopology;
use crate::crd::StrategyType;
use crate::dns::ResolverSelector;
use chrono::{DateTime, TimeZone, Utc};
use std::time::Duration;

pub const EDGE: &str = "10.0.0.53:53";
pub const NS_US: &str = "gslb-ns-cloud-example-com-us.example.com:53";
pub const NS_ZA: &str = "gslb-ns-cloud-example-com-za.example.com:53";
pub const HOST: &str = "app.cloud.example.com";
pub const LOCAL_NAME: &str = "localtargets-app.cloud.example.com";

pub fn topology() -> ClusterTopology {
    ClusterTopology {
        geo_tag: "eu".to_string(),
        dns_zone: "cloud.example.com".to_string(),
        edge_dns_zone: "example.com".to_string(),
        edge_dns_server: "10.0.0.53".to_string(),
        peer_geo_tags: vec!["us".to_string(), "za".to_string()],
        resolver: ResolverSelector::Direct,
        query_timeout: Duration::from_millis(200),
        split_brain_check: false,
    }
}

pub fn round_robin() -> GlobalService {
    GlobalService {
        name: "app".to_string(),
        namespace: "default".to_string(),
        delegated_zone: "cloud.example.com".to_string(),
        strategy: StrategyType::RoundRobin,
        primary_geo_tag: None,
        record_ttl: 30,
        split_brain_threshold: Duration::from_secs(300),
        owner: None,
    }
}

pub fn failover(primary: &str) -> GlobalService {
    GlobalService {
        strategy: StrategyType::Failover,
        primary_geo_tag: Some(primary.to_string()),
        ..round_robin()
    }
}

/// 2025-01-01T10:00:00Z
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}
