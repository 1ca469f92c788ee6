// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the DNS query client.

#[cfg(test)]
mod tests {
    use crate::dns::{bounded, to_fqdn, DnsQuerier, HickoryQuerier, MemoryQuerier, ResolverSelector};
    use crate::dns_errors::QueryError;
    use std::net::Ipv4Addr;
    use std::time::{Duration, Instant};

    #[test]
    fn test_direct_selector_appends_dns_port() {
        assert_eq!(ResolverSelector::Direct.select("10.0.0.53"), "10.0.0.53:53");
        assert_eq!(
            ResolverSelector::Direct.select("gslb-ns-cloud-example-com-us.example.com."),
            "gslb-ns-cloud-example-com-us.example.com:53"
        );
    }

    #[test]
    fn test_direct_selector_brackets_ipv6_servers() {
        let selected = ResolverSelector::Direct.select("fd00::53");
        assert_eq!(selected, "[fd00::53]:53");
        assert!(selected.parse::<std::net::SocketAddr>().is_ok());

        assert_eq!(ResolverSelector::Direct.select("::1"), "[::1]:53");
        assert_eq!(ResolverSelector::Direct.select("[::1]"), "[::1]:53");
    }

    #[test]
    fn test_override_selector_ignores_requested_server() {
        let selector = ResolverSelector::Override("127.0.0.1:5353".to_string());

        assert_eq!(selector.select("10.0.0.53"), "127.0.0.1:5353");
        assert_eq!(selector.select("anything.example.com"), "127.0.0.1:5353");
        assert_eq!(ResolverSelector::fake().select("x"), "127.0.0.1:7753");
    }

    #[test]
    fn test_to_fqdn() {
        assert_eq!(to_fqdn("app.example.com"), "app.example.com.");
        assert_eq!(to_fqdn("app.example.com."), "app.example.com.");
    }

    #[tokio::test]
    async fn test_memory_querier_answers_case_and_dot_insensitive() {
        let dns = MemoryQuerier::new().with_a("s:53", "LB.Example.com", &["10.1.0.1", "10.1.0.2"]);

        let ips = dns.query_a("s:53", "lb.example.com.").await.unwrap();
        assert_eq!(ips, vec![Ipv4Addr::new(10, 1, 0, 1), Ipv4Addr::new(10, 1, 0, 2)]);
        assert_eq!(
            dns.queries(),
            vec![("s:53".to_string(), "lb.example.com".to_string())]
        );
    }

    #[tokio::test]
    async fn test_memory_querier_unknown_name_is_nxdomain() {
        let dns = MemoryQuerier::new();

        let err = dns.query_a("s:53", "missing.example.com").await.unwrap_err();
        assert!(matches!(err, QueryError::NxDomain { .. }));
    }

    #[tokio::test]
    async fn test_memory_querier_failure_and_type_mismatch() {
        let dns = MemoryQuerier::new()
            .with_failure("s:53", "down.example.com")
            .with_txt("s:53", "hb.example.com", &["2025-01-01T00:00:00"]);

        assert!(matches!(
            dns.query_txt("s:53", "down.example.com").await,
            Err(QueryError::Transport { .. })
        ));
        assert!(dns.query_a("s:53", "hb.example.com").await.unwrap().is_empty());
        assert_eq!(
            dns.query_txt("s:53", "hb.example.com").await.unwrap(),
            vec!["2025-01-01T00:00:00".to_string()]
        );
    }

    #[tokio::test]
    async fn test_hickory_querier_rejects_invalid_name() {
        let dns = HickoryQuerier::new(Duration::from_millis(200));

        let too_long = format!("{}.example.com", "a".repeat(64));

        let err = dns.query_a("127.0.0.1:9", &too_long).await.unwrap_err();
        assert!(matches!(err, QueryError::InvalidName { .. }));
    }

    #[tokio::test]
    async fn test_hickory_querier_times_out() {
        // Nothing answers on the discard port; the query must give up on time.
        let dns = HickoryQuerier::new(Duration::from_millis(200));
        let started = Instant::now();

        let result = dns.query_a("127.0.0.1:9", "app.example.com").await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_bounded_turns_slow_answer_into_timeout() {
        let dns = MemoryQuerier::new()
            .with_a("slow:53", "app.example.com", &["10.0.0.1"])
            .with_delay("slow:53", Duration::from_secs(5));

        let err = bounded(
            Duration::from_millis(50),
            "slow:53",
            "app.example.com",
            dns.query_a("slow:53", "app.example.com"),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            QueryError::Timeout {
                name: "app.example.com".to_string(),
                server: "slow:53".to_string(),
                timeout_ms: 50,
            }
        );
    }

    #[tokio::test]
    async fn test_bounded_passes_through_fast_answer() {
        let dns = MemoryQuerier::new().with_a("s:53", "app.example.com", &["10.0.0.1"]);

        let ips = bounded(
            Duration::from_secs(1),
            "s:53",
            "app.example.com",
            dns.query_a("s:53", "app.example.com"),
        )
        .await
        .unwrap();

        assert_eq!(ips, vec![Ipv4Addr::new(10, 0, 0, 1)]);
    }
}
