// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::dns::MemoryQuerier;
    use crate::dns_errors::{HeartbeatError, QueryError};
    use crate::gslb::heartbeat::{
        check_alive, check_peers, format_heartbeat, heartbeat_fqdn, peer_heartbeat_fqdns,
        Freshness,
    };
    use crate::gslb::testing::{failover, now, round_robin, topology, EDGE};
    use std::time::Duration;

    const HB_US: &str = "app-heartbeat-us.example.com";
    const HB_ZA: &str = "app-heartbeat-za.example.com";
    const THRESHOLD: Duration = Duration::from_secs(300);
    const TIMEOUT: Duration = Duration::from_millis(200);

    async fn alive(dns: &MemoryQuerier) -> Result<(), HeartbeatError> {
        check_alive(dns, EDGE, HB_US, THRESHOLD, TIMEOUT, now()).await
    }

    #[test]
    fn test_heartbeat_names() {
        assert_eq!(heartbeat_fqdn("app", "us", "example.com"), HB_US);
        assert_eq!(
            peer_heartbeat_fqdns("app", &topology()),
            vec![
                ("us".to_string(), HB_US.to_string()),
                ("za".to_string(), HB_ZA.to_string()),
            ]
        );
    }

    #[test]
    fn test_format_heartbeat() {
        assert_eq!(format_heartbeat(now()), "2025-01-01T10:00:00");
    }

    #[tokio::test]
    async fn test_recent_heartbeat_is_alive() {
        let dns = MemoryQuerier::new().with_txt(EDGE, HB_US, &["2025-01-01T09:59:00"]);
        assert_eq!(alive(&dns).await, Ok(()));
    }

    #[tokio::test]
    async fn test_heartbeat_exactly_at_threshold_is_alive() {
        let dns = MemoryQuerier::new().with_txt(EDGE, HB_US, &["2025-01-01T09:55:00"]);
        assert_eq!(alive(&dns).await, Ok(()));
    }

    #[tokio::test]
    async fn test_heartbeat_past_threshold_is_expired() {
        let dns = MemoryQuerier::new().with_txt(EDGE, HB_US, &["2025-01-01T09:54:59"]);

        assert_eq!(
            alive(&dns).await,
            Err(HeartbeatError::Expired {
                fqdn: HB_US.to_string(),
                age_secs: 301,
                threshold_secs: 300,
            })
        );
    }

    #[tokio::test]
    async fn test_quoted_heartbeat_is_accepted() {
        let dns = MemoryQuerier::new().with_txt(EDGE, HB_US, &["\"2025-01-01T09:58:00\""]);
        assert_eq!(alive(&dns).await, Ok(()));
    }

    #[tokio::test]
    async fn test_future_heartbeat_is_alive() {
        let dns = MemoryQuerier::new().with_txt(EDGE, HB_US, &["2025-01-01T10:01:00"]);
        assert_eq!(alive(&dns).await, Ok(()));
    }

    #[tokio::test]
    async fn test_empty_answer_is_missing() {
        let dns = MemoryQuerier::new().with_txt(EDGE, HB_US, &[]);

        assert_eq!(
            alive(&dns).await,
            Err(HeartbeatError::Missing {
                fqdn: HB_US.to_string(),
                server: EDGE.to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_nxdomain_is_missing() {
        let dns = MemoryQuerier::new();

        let err = alive(&dns).await.unwrap_err();
        assert!(matches!(err, HeartbeatError::Missing { .. }));
        assert_eq!(err.verdict(), "missing");
    }

    #[tokio::test]
    async fn test_unparseable_heartbeat_is_malformed() {
        let dns = MemoryQuerier::new().with_txt(EDGE, HB_US, &["yesterday"]);

        assert_eq!(
            alive(&dns).await,
            Err(HeartbeatError::Malformed {
                fqdn: HB_US.to_string(),
                value: "yesterday".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_failed_query_is_unreachable() {
        let dns = MemoryQuerier::new().with_failure(EDGE, HB_US);

        let err = alive(&dns).await.unwrap_err();
        assert!(matches!(
            err,
            HeartbeatError::Unreachable {
                source: QueryError::Transport { .. },
                ..
            }
        ));
        assert_eq!(err.verdict(), "unreachable");
    }

    #[tokio::test]
    async fn test_slow_edge_server_times_out() {
        let dns = MemoryQuerier::new()
            .with_txt(EDGE, HB_US, &["2025-01-01T09:59:00"])
            .with_delay(EDGE, Duration::from_secs(5));

        let err = alive(&dns).await.unwrap_err();
        assert!(matches!(
            err,
            HeartbeatError::Unreachable {
                source: QueryError::Timeout { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_round_robin_without_guard_checks_nothing() {
        let dns = MemoryQuerier::new();

        let freshness = check_peers(&round_robin(), &topology(), &dns, now()).await;

        assert_eq!(freshness.get("us"), Some(&Freshness::Unchecked));
        assert_eq!(freshness.get("za"), Some(&Freshness::Unchecked));
        assert!(dns.queries().is_empty());
    }

    #[tokio::test]
    async fn test_guard_checks_every_peer() {
        let mut topology = topology();
        topology.split_brain_check = true;
        let dns = MemoryQuerier::new()
            .with_txt(EDGE, HB_US, &["2025-01-01T09:59:30"])
            .with_txt(EDGE, HB_ZA, &["2025-01-01T08:00:00"]);

        let freshness = check_peers(&round_robin(), &topology, &dns, now()).await;

        assert_eq!(freshness.get("us"), Some(&Freshness::Fresh));
        assert!(freshness.get("za").is_some_and(Freshness::is_stale));
    }

    #[tokio::test]
    async fn test_failover_secondary_checks_only_primary() {
        let dns = MemoryQuerier::new().with_txt(EDGE, HB_US, &["2025-01-01T09:59:30"]);

        let freshness = check_peers(&failover("us"), &topology(), &dns, now()).await;

        assert_eq!(freshness.get("us"), Some(&Freshness::Fresh));
        assert_eq!(freshness.get("za"), Some(&Freshness::Unchecked));
        assert_eq!(dns.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_failover_primary_checks_nothing() {
        let dns = MemoryQuerier::new();

        let freshness = check_peers(&failover("eu"), &topology(), &dns, now()).await;

        assert!(freshness.values().all(|f| *f == Freshness::Unchecked));
        assert!(dns.queries().is_empty());
    }
}
